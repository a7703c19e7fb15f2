//! Repository dependency graph and build-order validation.
//!
//! An edge `A → B` means "B depends on A": A must be built before B.
//! Topological ordering uses Kahn's algorithm with a name-ordered ready set,
//! so the computed order is deterministic for a given registry.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::ConfigError;
use crate::types::{RepoName, RepositoryDescriptor};

/// Directed dependency graph over registry names.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// `dependent → {dependency, ...}`
    upstream: BTreeMap<RepoName, BTreeSet<RepoName>>,
    /// `dependency → {dependent, ...}`
    downstream: BTreeMap<RepoName, BTreeSet<RepoName>>,
}

impl DependencyGraph {
    /// Build the graph from descriptors. Unknown dependency names are fatal.
    pub fn from_descriptors<'a, I>(descriptors: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a RepositoryDescriptor>,
    {
        let descriptors: Vec<&RepositoryDescriptor> = descriptors.into_iter().collect();
        let mut graph = Self::default();
        for d in &descriptors {
            graph.upstream.entry(d.name.clone()).or_default();
            graph.downstream.entry(d.name.clone()).or_default();
        }
        for d in &descriptors {
            for dep in &d.dependencies {
                if !graph.upstream.contains_key(dep) {
                    return Err(ConfigError::UnknownDependency {
                        repo: d.name.clone(),
                        dependency: dep.clone(),
                    });
                }
                graph
                    .upstream
                    .entry(d.name.clone())
                    .or_default()
                    .insert(dep.clone());
                graph
                    .downstream
                    .entry(dep.clone())
                    .or_default()
                    .insert(d.name.clone());
            }
        }
        Ok(graph)
    }

    pub fn contains(&self, name: &RepoName) -> bool {
        self.upstream.contains_key(name)
    }

    /// Dependencies before dependents; ties broken by name.
    ///
    /// Returns [`ConfigError::DependencyCycle`] naming the repositories on a
    /// cycle when no complete order exists.
    pub fn topological_order(&self) -> Result<Vec<RepoName>, ConfigError> {
        let mut in_degree: HashMap<&RepoName, usize> = self
            .upstream
            .iter()
            .map(|(name, deps)| (name, deps.len()))
            .collect();

        let mut ready: BTreeSet<&RepoName> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&name, _)| name)
            .collect();

        let mut sorted = Vec::with_capacity(self.upstream.len());
        while let Some(name) = ready.pop_first() {
            sorted.push(name.clone());
            for dependent in self.downstream.get(name).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(dependent) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if sorted.len() != self.upstream.len() {
            let placed: HashSet<&RepoName> = sorted.iter().collect();
            let remaining: BTreeSet<&RepoName> = self
                .upstream
                .keys()
                .filter(|name| !placed.contains(name))
                .collect();
            return Err(ConfigError::DependencyCycle {
                repos: self.find_cycle(&remaining),
            });
        }
        Ok(sorted)
    }

    /// Check an operator-declared order: every registry name exactly once,
    /// no unknown names, dependencies strictly earlier.
    pub fn validate_order(&self, order: &[RepoName]) -> Result<(), ConfigError> {
        let mut seen: HashSet<&RepoName> = HashSet::new();
        for name in order {
            if !self.contains(name) {
                return Err(ConfigError::UnknownInBuildOrder { repo: name.clone() });
            }
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateInBuildOrder { repo: name.clone() });
            }
        }

        let missing: Vec<RepoName> = self
            .upstream
            .keys()
            .filter(|name| !seen.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingFromBuildOrder { repos: missing });
        }

        let position: HashMap<&RepoName, usize> =
            order.iter().enumerate().map(|(i, n)| (n, i)).collect();
        for name in order {
            for dep in self.upstream.get(name).into_iter().flatten() {
                if position[dep] > position[name] {
                    return Err(ConfigError::OrderViolation {
                        repo: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Repositories that list `name` directly in their `dependencies`.
    pub fn direct_dependents(&self, name: &RepoName) -> BTreeSet<RepoName> {
        self.downstream.get(name).cloned().unwrap_or_default()
    }

    /// Every repository reachable downstream of `name` (not including itself).
    pub fn transitive_dependents(&self, name: &RepoName) -> BTreeSet<RepoName> {
        let mut found = BTreeSet::new();
        let mut queue: VecDeque<&RepoName> = VecDeque::from([name]);
        while let Some(current) = queue.pop_front() {
            for dependent in self.downstream.get(current).into_iter().flatten() {
                if found.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }
        found.remove(name);
        found
    }

    pub fn dependencies_of(&self, name: &RepoName) -> BTreeSet<RepoName> {
        self.upstream.get(name).cloned().unwrap_or_default()
    }

    /// DFS over the unsortable remainder; every node left by Kahn's algorithm
    /// either sits on a cycle or downstream of one.
    fn find_cycle(&self, remaining: &BTreeSet<&RepoName>) -> Vec<RepoName> {
        for &start in remaining {
            let mut path: Vec<&RepoName> = vec![start];
            let mut on_path: HashSet<&RepoName> = HashSet::from([start]);
            let mut visited: HashSet<&RepoName> = HashSet::new();
            if let Some(cycle) = self.walk(start, remaining, &mut path, &mut on_path, &mut visited)
            {
                return cycle;
            }
        }
        remaining.iter().map(|&n| n.clone()).collect()
    }

    fn walk<'a>(
        &'a self,
        node: &'a RepoName,
        remaining: &BTreeSet<&RepoName>,
        path: &mut Vec<&'a RepoName>,
        on_path: &mut HashSet<&'a RepoName>,
        visited: &mut HashSet<&'a RepoName>,
    ) -> Option<Vec<RepoName>> {
        visited.insert(node);
        for dep in self.upstream.get(node).into_iter().flatten() {
            if !remaining.contains(dep) {
                continue;
            }
            if on_path.contains(dep) {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                return Some(path[start..].iter().map(|&n| n.clone()).collect());
            }
            if visited.contains(dep) {
                continue;
            }
            path.push(dep);
            on_path.insert(dep);
            if let Some(cycle) = self.walk(dep, remaining, path, on_path, visited) {
                return Some(cycle);
            }
            on_path.remove(dep);
            path.pop();
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn repo(name: &str, deps: &[&str]) -> RepositoryDescriptor {
        RepositoryDescriptor {
            name: RepoName::from(name),
            url: format!("https://example.com/{name}.git"),
            branch: "main".to_string(),
            directory: PathBuf::from(name),
            core: false,
            dependencies: deps.iter().map(|d| RepoName::from(*d)).collect(),
            description: String::new(),
        }
    }

    fn names(list: &[&str]) -> Vec<RepoName> {
        list.iter().map(|n| RepoName::from(*n)).collect()
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let repos = vec![
            repo("composer", &["builder", "battle"]),
            repo("battle", &["builder"]),
            repo("builder", &[]),
        ];
        let graph = DependencyGraph::from_descriptors(&repos).expect("graph");
        let order = graph.topological_order().expect("order");
        assert_eq!(order, names(&["builder", "battle", "composer"]));
    }

    #[test]
    fn independent_roots_sorted_by_name() {
        let repos = vec![repo("zeta", &[]), repo("alpha", &[]), repo("mid", &["zeta"])];
        let graph = DependencyGraph::from_descriptors(&repos).expect("graph");
        assert_eq!(
            graph.topological_order().expect("order"),
            names(&["alpha", "zeta", "mid"])
        );
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let repos = vec![repo("battle", &["ghost"])];
        let err = DependencyGraph::from_descriptors(&repos).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDependency { .. }), "got: {err}");
    }

    #[test]
    fn cycle_reports_members() {
        let repos = vec![
            repo("a", &["c"]),
            repo("b", &["a"]),
            repo("c", &["b"]),
            repo("d", &["a"]),
            repo("root", &[]),
        ];
        let graph = DependencyGraph::from_descriptors(&repos).expect("graph");
        let err = graph.topological_order().unwrap_err();
        let ConfigError::DependencyCycle { repos } = err else {
            panic!("expected cycle error");
        };
        let members: BTreeSet<_> = repos.into_iter().collect();
        assert_eq!(members, names(&["a", "b", "c"]).into_iter().collect());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let repos = vec![repo("loop", &["loop"])];
        let graph = DependencyGraph::from_descriptors(&repos).expect("graph");
        assert!(matches!(
            graph.topological_order(),
            Err(ConfigError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn validate_order_detects_violation() {
        let repos = vec![repo("builder", &[]), repo("battle", &["builder"])];
        let graph = DependencyGraph::from_descriptors(&repos).expect("graph");
        assert!(graph.validate_order(&names(&["builder", "battle"])).is_ok());

        let err = graph
            .validate_order(&names(&["battle", "builder"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::OrderViolation { .. }), "got: {err}");
    }

    #[test]
    fn validate_order_detects_duplicates_unknowns_and_omissions() {
        let repos = vec![repo("builder", &[]), repo("battle", &["builder"])];
        let graph = DependencyGraph::from_descriptors(&repos).expect("graph");

        assert!(matches!(
            graph.validate_order(&names(&["builder", "builder", "battle"])),
            Err(ConfigError::DuplicateInBuildOrder { .. })
        ));
        assert!(matches!(
            graph.validate_order(&names(&["builder", "ghost", "battle"])),
            Err(ConfigError::UnknownInBuildOrder { .. })
        ));
        assert!(matches!(
            graph.validate_order(&names(&["builder"])),
            Err(ConfigError::MissingFromBuildOrder { .. })
        ));
    }

    #[test]
    fn dependents_direct_and_transitive() {
        let repos = vec![
            repo("builder", &[]),
            repo("battle", &["builder"]),
            repo("composer", &["battle"]),
        ];
        let graph = DependencyGraph::from_descriptors(&repos).expect("graph");
        let builder = RepoName::from("builder");

        assert_eq!(
            graph.direct_dependents(&builder),
            names(&["battle"]).into_iter().collect()
        );
        assert_eq!(
            graph.transitive_dependents(&builder),
            names(&["battle", "composer"]).into_iter().collect()
        );
        assert!(graph.transitive_dependents(&RepoName::from("composer")).is_empty());
    }
}

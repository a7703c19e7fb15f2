//! Registry loader for `config/repos.json`.
//!
//! # API pattern
//!
//! - `load_at(path)` — explicit registry file; used in tests with `TempDir`
//! - `load(workspace)` — the workspace's configured registry path
//!
//! Loading is all-or-nothing: a registry that parses but fails graph
//! validation is rejected with the same fatal [`ConfigError`] tier as a
//! missing file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::ConfigError;
use crate::graph::DependencyGraph;
use crate::types::{RegistryFile, RepoName, RepositoryDescriptor};
use crate::workspace::Workspace;

/// Validated registry: descriptors, a build order consistent with the
/// declared dependencies, and the dependency graph.
#[derive(Debug, Clone)]
pub struct Registry {
    repositories: BTreeMap<RepoName, RepositoryDescriptor>,
    build_order: Vec<RepoName>,
    graph: DependencyGraph,
    /// `true` when `build_order` came from the file rather than the graph.
    declared_order: bool,
}

impl Registry {
    /// Validate a parsed registry file.
    pub fn from_file(file: RegistryFile) -> Result<Self, ConfigError> {
        let repositories: BTreeMap<RepoName, RepositoryDescriptor> = file
            .repositories
            .into_iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    RepositoryDescriptor::from_entry(name, entry),
                )
            })
            .collect();

        let graph = DependencyGraph::from_descriptors(repositories.values())?;
        let computed = graph.topological_order()?;

        let (build_order, declared_order) = match file.build_order {
            Some(declared) => {
                graph.validate_order(&declared)?;
                (declared, true)
            }
            None => (computed, false),
        };

        tracing::debug!(
            repositories = repositories.len(),
            declared_order,
            "registry validated"
        );

        Ok(Self {
            repositories,
            build_order,
            graph,
            declared_order,
        })
    }

    pub fn get(&self, name: &RepoName) -> Option<&RepositoryDescriptor> {
        self.repositories.get(name)
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn build_order(&self) -> &[RepoName] {
        &self.build_order
    }

    pub fn has_declared_order(&self) -> bool {
        self.declared_order
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Descriptors in build order.
    pub fn ordered(&self) -> impl Iterator<Item = &RepositoryDescriptor> + '_ {
        self.build_order
            .iter()
            .filter_map(|name| self.repositories.get(name))
    }

    /// Names flagged `core: true`.
    pub fn core_repositories(&self) -> BTreeSet<RepoName> {
        self.repositories
            .values()
            .filter(|d| d.core)
            .map(|d| d.name.clone())
            .collect()
    }

    /// Restrict the build order to `selection`, preserving build-order
    /// sequence and visiting each name once. An empty selection means all.
    pub fn select(&self, selection: &[RepoName]) -> Result<Vec<RepoName>, ConfigError> {
        if selection.is_empty() {
            return Ok(self.build_order.clone());
        }
        for name in selection {
            if !self.repositories.contains_key(name) {
                return Err(ConfigError::UnknownRepository { repo: name.clone() });
            }
        }
        let wanted: BTreeSet<&RepoName> = selection.iter().collect();
        Ok(self
            .build_order
            .iter()
            .filter(|name| wanted.contains(name))
            .cloned()
            .collect())
    }

    /// Order a set of names by build order.
    pub fn in_build_order(&self, names: &BTreeSet<RepoName>) -> Vec<RepoName> {
        self.build_order
            .iter()
            .filter(|name| names.contains(*name))
            .cloned()
            .collect()
    }
}

/// Parse registry JSON text. `path` is used for error context only.
pub fn parse(contents: &str, path: &Path) -> Result<Registry, ConfigError> {
    let file: RegistryFile = serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Registry::from_file(file)
}

/// Load and validate the registry at `path`.
///
/// Returns `ConfigError::RegistryNotFound` if absent, `ConfigError::Parse`
/// (with path + line context) if malformed, and a graph error if the
/// declared dependencies or build order are inconsistent.
pub fn load_at(path: &Path) -> Result<Registry, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::RegistryNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&contents, path)
}

/// `load_at` for the workspace's configured registry.
pub fn load(workspace: &Workspace) -> Result<Registry, ConfigError> {
    load_at(&workspace.registry_path)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const REGISTRY: &str = r#"{
        "repositories": {
            "builder":  { "url": "https://example.com/builder.git", "core": true },
            "battle":   { "url": "https://example.com/battle.git", "dependencies": ["builder"] },
            "composer": { "url": "https://example.com/composer.git", "dependencies": ["builder", "battle"] }
        },
        "build_order": ["builder", "battle", "composer"]
    }"#;

    fn names(list: &[&str]) -> Vec<RepoName> {
        list.iter().map(|n| RepoName::from(*n)).collect()
    }

    fn registry() -> Registry {
        parse(REGISTRY, &PathBuf::from("repos.json")).expect("parse")
    }

    #[test]
    fn declared_order_is_kept() {
        let reg = registry();
        assert!(reg.has_declared_order());
        assert_eq!(reg.build_order(), names(&["builder", "battle", "composer"]));
        assert_eq!(
            reg.core_repositories(),
            names(&["builder"]).into_iter().collect()
        );
    }

    #[test]
    fn select_preserves_build_order_and_dedups() {
        let reg = registry();
        let picked = reg
            .select(&names(&["composer", "builder", "composer"]))
            .expect("select");
        assert_eq!(picked, names(&["builder", "composer"]));
    }

    #[test]
    fn select_rejects_unknown_names() {
        let err = registry().select(&names(&["ghost"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRepository { .. }));
    }

    #[test]
    fn ordered_yields_descriptors_in_sequence() {
        let reg = registry();
        let seen: Vec<_> = reg.ordered().map(|d| d.name.0.clone()).collect();
        assert_eq!(seen, vec!["builder", "battle", "composer"]);
    }
}

//! Domain types for the Ensemble repository registry.
//!
//! The on-disk shape (`config/repos.json`) is modelled by [`RegistryFile`];
//! the validated, graph-checked form handed to every command is
//! [`crate::registry::Registry`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a managed repository (the registry map key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(pub String);

impl RepoName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

fn default_branch() -> String {
    "main".to_string()
}

/// Raw descriptor entry as written in `repos.json`.
///
/// The name is the map key, so it is not repeated inside the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorEntry {
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Clone directory under `projects/`. Defaults to the repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub core: bool,
    #[serde(default)]
    pub dependencies: Vec<RepoName>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A managed repository. Read-only for every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub name: RepoName,
    pub url: String,
    pub branch: String,
    /// Directory relative to `projects/`.
    pub directory: PathBuf,
    /// A failing build of a core repository aborts the whole build run.
    pub core: bool,
    pub dependencies: Vec<RepoName>,
    pub description: String,
}

impl RepositoryDescriptor {
    pub fn from_entry(name: RepoName, entry: DescriptorEntry) -> Self {
        let directory = entry
            .directory
            .unwrap_or_else(|| PathBuf::from(&name.0));
        Self {
            name,
            url: entry.url,
            branch: entry.branch,
            directory,
            core: entry.core,
            dependencies: entry.dependencies,
            description: entry.description,
        }
    }
}

/// Root of `config/repos.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RegistryFile {
    pub repositories: BTreeMap<RepoName, DescriptorEntry>,
    /// Operator-declared order. Validated against `dependencies` when present;
    /// the computed topological order is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_order: Option<Vec<RepoName>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

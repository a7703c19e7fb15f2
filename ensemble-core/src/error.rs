//! Error types for ensemble-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RepoName;

/// Fatal configuration errors. Every command depends on a valid registry, so
/// none of these has a recovery path.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The registry JSON file did not exist at the expected path.
    #[error("registry not found at {path}")]
    RegistryNotFound { path: PathBuf },

    /// Underlying I/O failure while reading the registry.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load, with file path and serde_json line context.
    #[error("failed to parse registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("repository '{repo}' depends on unknown repository '{dependency}'")]
    UnknownDependency { repo: RepoName, dependency: RepoName },

    #[error("dependency cycle between repositories: {}", join(.repos))]
    DependencyCycle { repos: Vec<RepoName> },

    #[error("build_order names unknown repository '{repo}'")]
    UnknownInBuildOrder { repo: RepoName },

    #[error("build_order lists '{repo}' more than once")]
    DuplicateInBuildOrder { repo: RepoName },

    #[error("build_order is missing repositories: {}", join(.repos))]
    MissingFromBuildOrder { repos: Vec<RepoName> },

    #[error("build_order places '{repo}' before its dependency '{dependency}'")]
    OrderViolation { repo: RepoName, dependency: RepoName },

    /// A name passed on the command line is not in the registry.
    #[error("unknown repository '{repo}'")]
    UnknownRepository { repo: RepoName },
}

fn join(repos: &[RepoName]) -> String {
    repos
        .iter()
        .map(RepoName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

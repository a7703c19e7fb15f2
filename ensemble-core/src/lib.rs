//! Ensemble core library — registry types, dependency graph, workspace paths.
//!
//! - [`types`] — newtypes and descriptor structs
//! - [`error`] — [`ConfigError`]
//! - [`graph`] — dependency graph and build-order validation
//! - [`registry`] — load / validate `config/repos.json`
//! - [`workspace`] — resolved paths and tool programs

pub mod error;
pub mod graph;
pub mod registry;
pub mod types;
pub mod workspace;

pub use error::ConfigError;
pub use graph::DependencyGraph;
pub use registry::Registry;
pub use types::{DescriptorEntry, RegistryFile, RepoName, RepositoryDescriptor};
pub use workspace::Workspace;

//! Workspace paths and tool settings.
//!
//! Resolved once by the CLI and threaded explicitly into every command;
//! nothing in the libraries reads the process working directory.

use std::path::{Path, PathBuf};

use crate::types::RepositoryDescriptor;

pub const REGISTRY_FILE: &str = "config/repos.json";
pub const PROJECTS_DIR: &str = "projects";
pub const STATE_DIR: &str = ".ensemble";
pub const BUILD_OUTPUT_DIR: &str = "dist";
pub const MANIFEST_FILE: &str = "package.json";
pub const GIT_DIR: &str = ".git";

/// Locations and external programs for one orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub registry_path: PathBuf,
    pub npm: String,
    pub git: String,
}

impl Workspace {
    /// Workspace at `root` with the default registry path and tools.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            registry_path: root.join(REGISTRY_FILE),
            root,
            npm: "npm".to_string(),
            git: "git".to_string(),
        }
    }

    pub fn with_registry(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = path.into();
        self
    }

    pub fn with_npm(mut self, program: impl Into<String>) -> Self {
        self.npm = program.into();
        self
    }

    pub fn with_git(mut self, program: impl Into<String>) -> Self {
        self.git = program.into();
        self
    }

    /// `<root>/projects/`
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    /// `<root>/projects/<directory>/` — pure, no I/O.
    pub fn clone_dir(&self, descriptor: &RepositoryDescriptor) -> PathBuf {
        self.projects_dir().join(&descriptor.directory)
    }

    /// `<root>/.ensemble/`
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn root_manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// A git checkout exists at the clone directory. A bare directory, such
    /// as one left by an interrupted clone, does not count.
    pub fn is_cloned(&self, descriptor: &RepositoryDescriptor) -> bool {
        self.clone_dir(descriptor).join(GIT_DIR).exists()
    }
}

/// `<clone>/dist/`
pub fn build_output_dir(clone_dir: &Path) -> PathBuf {
    clone_dir.join(BUILD_OUTPUT_DIR)
}

use ensemble_core::{Registry, RepoName, RepositoryDescriptor, Workspace};
use ensemble_exec::{Git, Npm, ProcessRunner};

use crate::strategy::{Sequential, Strategy};

/// Everything a command needs: where the workspace is, what it contains, how
/// to run processes, and how to iterate.
pub struct Context<'a, R: ProcessRunner + ?Sized> {
    pub workspace: &'a Workspace,
    pub registry: &'a Registry,
    pub runner: &'a R,
    pub strategy: &'a dyn Strategy,
}

impl<'a, R: ProcessRunner + ?Sized> Context<'a, R> {
    pub fn new(workspace: &'a Workspace, registry: &'a Registry, runner: &'a R) -> Self {
        Self {
            workspace,
            registry,
            runner,
            strategy: &Sequential,
        }
    }

    pub fn with_strategy(mut self, strategy: &'a dyn Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn git(&self) -> Git<'a, R> {
        Git::new(self.runner, &self.workspace.git)
    }

    pub fn npm(&self) -> Npm<'a, R> {
        Npm::new(self.runner, &self.workspace.npm)
    }

    /// Descriptor for a name already resolved against the registry.
    pub(crate) fn descriptor(&self, name: &RepoName) -> Option<&'a RepositoryDescriptor> {
        self.registry.get(name)
    }
}

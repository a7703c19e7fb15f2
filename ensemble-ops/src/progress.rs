//! Progress callbacks so the binary can print a line per repository as the
//! run advances, while the library stays free of terminal concerns.

use ensemble_core::RepoName;

use crate::outcome::RepoOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Clone,
    Link,
    Build,
    Test,
    Clean,
    Update,
    Status,
}

impl Action {
    pub fn verb(self) -> &'static str {
        match self {
            Action::Clone => "cloning",
            Action::Link => "linking",
            Action::Build => "building",
            Action::Test => "testing",
            Action::Clean => "cleaning",
            Action::Update => "updating",
            Action::Status => "checking",
        }
    }
}

pub trait Progress {
    fn started(&mut self, _action: Action, _name: &RepoName) {}
    fn finished(&mut self, _action: Action, _name: &RepoName, _outcome: &RepoOutcome) {}
    /// A workspace-level phase (root install, link pass, rebuild).
    fn phase(&mut self, _message: &str) {}
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct Silent;

impl Progress for Silent {}

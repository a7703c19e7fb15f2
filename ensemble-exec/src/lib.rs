//! # ensemble-exec
//!
//! Process execution for the orchestrator: the [`ProcessRunner`] seam, the
//! `git`/`npm` command wrappers built on it, and `package.json` handling.

pub mod error;
pub mod git;
pub mod manifest;
pub mod npm;
pub mod runner;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::ExecError;
pub use git::{CommitSummary, Git};
pub use manifest::{local_reference, LinkChange, Manifest};
pub use npm::Npm;
pub use runner::{Invocation, OutputMode, ProcessOutput, ProcessRunner, SystemRunner};

//! # ensemble-ops
//!
//! The orchestration commands, each a function over a [`Context`]:
//!
//! - [`setup`] — clone, install, link, build
//! - [`build`] / [`test`] — run project scripts in dependency order
//! - [`status`] — read-only health overview
//! - [`clean`] — remove artifacts, optionally dependencies
//! - [`update`] — fast-forward clones and rebuild what changed
//!
//! Commands return reports; rendering them is the binary's job.

pub mod build;
pub mod clean;
pub mod context;
pub mod error;
pub mod lock;
pub mod outcome;
pub mod progress;
pub mod setup;
pub mod status;
pub mod strategy;
pub mod update;

pub use build::{build_affected, BuildOptions, BuildReport};
pub use clean::{CleanOptions, CleanReport};
pub use context::Context;
pub use error::OpsError;
pub use lock::WorkspaceLock;
pub use outcome::{RepoOutcome, Report, StepOutcome, Tally};
pub use progress::{Action, Progress, Silent};
pub use setup::{SetupOptions, SetupReport};
pub use status::{Health, HealthSummary, RepoStatus, StatusOptions, StatusReport};
pub use strategy::{Flow, Sequential, Strategy};
pub use test::{TestOptions, TestReport};
pub use update::{Invalidation, UpdateOptions, UpdateReport};

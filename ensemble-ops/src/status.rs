//! `status`: read-only health overview of every repository.
//!
//! Never takes the workspace lock and never fails per repository: any git
//! read that errors degrades to an empty field and a `warn`.

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use ensemble_core::workspace::build_output_dir;
use ensemble_core::{RepoName, RepositoryDescriptor};
use ensemble_exec::{CommitSummary, Manifest, ProcessRunner};

use crate::context::Context;
use crate::outcome::{RepoOutcome, StepOutcome};
use crate::progress::{Action, Progress};
use crate::strategy::Flow;

#[derive(Debug, Clone, Copy)]
pub struct StatusOptions {
    /// Run `git fetch --dry-run` before counting commits behind.
    pub fetch: bool,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self { fetch: true }
    }
}

/// Per-repository classification, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    NotCloned,
    NoBuild,
    Uncommitted,
    Behind(u32),
    Ok,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Health::NotCloned => f.write_str("Not cloned"),
            Health::NoBuild => f.write_str("No build"),
            Health::Uncommitted => f.write_str("Uncommitted"),
            Health::Behind(n) => write!(f, "{n} behind"),
            Health::Ok => f.write_str("OK"),
        }
    }
}

impl Health {
    /// Stable machine-readable key.
    pub fn key(&self) -> &'static str {
        match self {
            Health::NotCloned => "not_cloned",
            Health::NoBuild => "no_build",
            Health::Uncommitted => "uncommitted",
            Health::Behind(_) => "behind",
            Health::Ok => "ok",
        }
    }
}

/// Classify a present clone: missing build > uncommitted > behind > OK.
pub fn classify(has_build: bool, dirty: bool, behind: u32) -> Health {
    if !has_build {
        Health::NoBuild
    } else if dirty {
        Health::Uncommitted
    } else if behind > 0 {
        Health::Behind(behind)
    } else {
        Health::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub name: RepoName,
    pub directory: PathBuf,
    pub core: bool,
    pub cloned: bool,
    pub branch: Option<String>,
    pub last_commit: Option<CommitSummary>,
    pub dirty: bool,
    pub ahead: u32,
    pub behind: u32,
    pub has_build: bool,
    pub has_test_script: bool,
    pub health: Health,
}

impl RepoStatus {
    fn not_cloned(descriptor: &RepositoryDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            directory: descriptor.directory.clone(),
            core: descriptor.core,
            cloned: false,
            branch: None,
            last_commit: None,
            dirty: false,
            ahead: 0,
            behind: 0,
            has_build: false,
            has_test_script: false,
            health: Health::NotCloned,
        }
    }
}

/// Repositories grouped by problem, in build order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSummary {
    pub not_cloned: Vec<RepoName>,
    pub no_build: Vec<RepoName>,
    pub uncommitted: Vec<RepoName>,
    pub behind: Vec<RepoName>,
    pub no_tests: Vec<RepoName>,
}

impl HealthSummary {
    pub fn from_statuses(statuses: &[RepoStatus]) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            match status.health {
                Health::NotCloned => summary.not_cloned.push(status.name.clone()),
                Health::NoBuild => summary.no_build.push(status.name.clone()),
                Health::Uncommitted => summary.uncommitted.push(status.name.clone()),
                Health::Behind(_) => summary.behind.push(status.name.clone()),
                Health::Ok => {}
            }
            if status.cloned && !status.has_test_script {
                summary.no_tests.push(status.name.clone());
            }
        }
        summary
    }

    pub fn is_healthy(&self) -> bool {
        self.not_cloned.is_empty()
            && self.no_build.is_empty()
            && self.uncommitted.is_empty()
            && self.behind.is_empty()
    }

    /// Advisory commands for each problem category.
    pub fn suggestions(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.not_cloned.is_empty() {
            out.push("run `ensemble setup` to clone missing repositories".to_string());
        }
        if !self.no_build.is_empty() {
            out.push(format!(
                "run `ensemble build {}` to produce missing build output",
                join(&self.no_build)
            ));
        }
        if !self.uncommitted.is_empty() {
            out.push(format!(
                "commit or stash local changes in {}",
                join(&self.uncommitted)
            ));
        }
        if !self.behind.is_empty() {
            out.push("run `ensemble update` to pull upstream changes".to_string());
        }
        if !self.no_tests.is_empty() {
            out.push(format!("add a `test` script to {}", join(&self.no_tests)));
        }
        out
    }
}

fn join(names: &[RepoName]) -> String {
    names
        .iter()
        .map(RepoName::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub repos: Vec<RepoStatus>,
    pub summary: HealthSummary,
}

pub fn status<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    options: &StatusOptions,
    progress: &mut dyn Progress,
) -> StatusReport {
    let mut repos = Vec::with_capacity(ctx.registry.len());

    ctx.strategy.visit(ctx.registry.build_order(), &mut |name| {
        if let Some(descriptor) = ctx.descriptor(name) {
            progress.started(Action::Status, name);
            let status = inspect(ctx, descriptor, options);
            progress.finished(Action::Status, name, &RepoOutcome::Success);
            repos.push(status);
        }
        Flow::Continue
    });

    let summary = HealthSummary::from_statuses(&repos);
    StatusReport { repos, summary }
}

fn inspect<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    descriptor: &RepositoryDescriptor,
    options: &StatusOptions,
) -> RepoStatus {
    let dir = ctx.workspace.clone_dir(descriptor);
    if !dir.is_dir() {
        return RepoStatus::not_cloned(descriptor);
    }

    let git = ctx.git();
    let name = &descriptor.name;

    let branch = git.current_branch(&dir).map_err(|e| read_failed(name, "branch", &e)).ok();
    let last_commit = git.last_commit(&dir).map_err(|e| read_failed(name, "log", &e)).ok();
    let dirty = git
        .is_dirty(&dir)
        .map_err(|e| read_failed(name, "status", &e))
        .unwrap_or(false);

    if options.fetch {
        StepOutcome::from_result(git.fetch_dry_run(&dir)).logged("fetch", name);
    }
    let behind = git.behind_count(&dir).unwrap_or(0);
    let ahead = git.ahead_count(&dir).unwrap_or(0);

    let has_build = build_output_dir(&dir).is_dir();
    let has_test_script = match Manifest::load(&dir) {
        Ok(Some(manifest)) => manifest.has_script("test"),
        Ok(None) => false,
        Err(e) => {
            read_failed(name, "manifest", &e);
            false
        }
    };

    RepoStatus {
        name: name.clone(),
        directory: descriptor.directory.clone(),
        core: descriptor.core,
        cloned: true,
        branch,
        last_commit,
        dirty,
        ahead,
        behind,
        has_build,
        has_test_script,
        health: classify(has_build, dirty, behind),
    }
}

fn read_failed(name: &RepoName, what: &str, err: &dyn fmt::Display) {
    warn!(repo = %name, what, error = %err, "status read failed");
}

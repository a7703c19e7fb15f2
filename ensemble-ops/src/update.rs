//! `update`: fast-forward every clone and rebuild what changed.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::info;

use ensemble_core::{Registry, RepoName, RepositoryDescriptor};
use ensemble_exec::{ExecError, OutputMode, ProcessRunner};

use crate::build::{build_sequence, BuildReport};
use crate::context::Context;
use crate::error::OpsError;
use crate::outcome::{RepoOutcome, Report};
use crate::progress::{Action, Progress};
use crate::setup::install_root;
use crate::strategy::Flow;

/// Which dependents of an updated repository get rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Invalidation {
    /// Direct dependents only.
    Shallow,
    /// Everything reachable through declared dependencies.
    #[default]
    Transitive,
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub dry_run: bool,
    pub clean: bool,
    /// Reinstall and rebuild after pulling.
    pub build: bool,
    pub invalidation: Invalidation,
    pub output: OutputMode,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            clean: false,
            build: true,
            invalidation: Invalidation::default(),
            output: OutputMode::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub dry_run: bool,
    pub report: Report,
    /// Repositories selected for rebuild, in build order.
    pub rebuild: Vec<RepoName>,
    pub reinstalled: bool,
    pub build: Option<BuildReport>,
}

impl UpdateReport {
    pub fn updated(&self) -> Vec<RepoName> {
        self.report.names_where(|outcome| {
            matches!(
                outcome,
                RepoOutcome::Updated { .. } | RepoOutcome::WouldUpdate { .. }
            )
        })
    }

    pub fn exit_code(&self) -> i32 {
        let build_failed = self.build.as_ref().is_some_and(|b| !b.succeeded());
        if self.report.has_failures() || build_failed {
            1
        } else {
            0
        }
    }
}

/// Updated repositories plus their invalidated dependents, in build order.
pub fn rebuild_selection(
    registry: &Registry,
    updated: &BTreeSet<RepoName>,
    invalidation: Invalidation,
) -> Vec<RepoName> {
    let graph = registry.graph();
    let mut selected = updated.clone();
    for name in updated {
        let dependents = match invalidation {
            Invalidation::Shallow => graph.direct_dependents(name),
            Invalidation::Transitive => graph.transitive_dependents(name),
        };
        selected.extend(dependents);
    }
    registry.in_build_order(&selected)
}

pub fn update<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    options: &UpdateOptions,
    progress: &mut dyn Progress,
) -> Result<UpdateReport, OpsError> {
    let mut report = Report::default();

    ctx.strategy.visit(ctx.registry.build_order(), &mut |name| {
        if let Some(descriptor) = ctx.descriptor(name) {
            progress.started(Action::Update, name);
            let outcome = update_one(ctx, descriptor, options.dry_run);
            info!(repo = %name, outcome = outcome.label(), "update finished");
            progress.finished(Action::Update, name, &outcome);
            report.record(name.clone(), outcome);
        }
        Flow::Continue
    });

    let mut result = UpdateReport {
        dry_run: options.dry_run,
        report,
        ..UpdateReport::default()
    };
    let updated: BTreeSet<RepoName> = result.updated().into_iter().collect();
    if updated.is_empty() {
        return Ok(result);
    }

    result.rebuild = rebuild_selection(ctx.registry, &updated, options.invalidation);
    if options.dry_run || !options.build {
        return Ok(result);
    }

    result.reinstalled = install_root(ctx, progress)?;
    progress.phase("rebuilding updated repositories");
    result.build = Some(build_sequence(
        ctx,
        &result.rebuild,
        options.clean,
        options.output,
        progress,
    ));
    Ok(result)
}

fn update_one<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    descriptor: &RepositoryDescriptor,
    dry_run: bool,
) -> RepoOutcome {
    let dir = ctx.workspace.clone_dir(descriptor);
    if !dir.is_dir() {
        return RepoOutcome::Missing;
    }
    fast_forward(ctx, &dir, &descriptor.branch, dry_run).unwrap_or_else(|e| RepoOutcome::Failed {
        reason: e.to_string(),
    })
}

/// Record `HEAD`, fetch, then pull (or only count commits behind on a dry run).
fn fast_forward<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    dir: &Path,
    branch: &str,
    dry_run: bool,
) -> Result<RepoOutcome, ExecError> {
    let git = ctx.git();
    let before = git.head(dir)?;
    git.fetch(dir, branch)?;
    if dry_run {
        let behind = git.behind_count(dir)?;
        return Ok(if behind > 0 {
            RepoOutcome::WouldUpdate { behind }
        } else {
            RepoOutcome::UpToDate
        });
    }
    git.pull(dir, branch)?;
    let after = git.head(dir)?;
    Ok(if before == after {
        RepoOutcome::UpToDate
    } else {
        RepoOutcome::Updated {
            from: before,
            to: after,
        }
    })
}

//! `build`: run each project's `build` script in dependency order.
//!
//! A failing core repository aborts the run; every later repository is
//! recorded as skipped so the report always covers the whole selection.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use ensemble_core::workspace::build_output_dir;
use ensemble_core::{RepoName, RepositoryDescriptor};
use ensemble_exec::{Manifest, OutputMode, ProcessRunner};

use crate::context::Context;
use crate::error::OpsError;
use crate::outcome::{RepoOutcome, Report, StepOutcome};
use crate::progress::{Action, Progress};
use crate::strategy::Flow;

/// Lines of child output kept in a failure reason.
pub const FAILURE_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Empty means every repository.
    pub selection: Vec<RepoName>,
    /// Best-effort clean before each build.
    pub clean: bool,
    pub output: OutputMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub report: Report,
    /// Core repository whose failure stopped the run.
    pub aborted: Option<RepoName>,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.aborted.is_none() && !self.report.has_failures()
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

pub fn build<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    options: &BuildOptions,
    progress: &mut dyn Progress,
) -> Result<BuildReport, OpsError> {
    let order = ctx.registry.select(&options.selection)?;
    Ok(build_sequence(ctx, &order, options.clean, options.output, progress))
}

/// Build `changed` plus everything that transitively depends on it, in
/// build order. Used by watch mode.
pub fn build_affected<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    changed: &RepoName,
    output: OutputMode,
    progress: &mut dyn Progress,
) -> BuildReport {
    let mut affected = ctx.registry.graph().transitive_dependents(changed);
    affected.insert(changed.clone());
    let order = ctx.registry.in_build_order(&affected);
    build_sequence(ctx, &order, false, output, progress)
}

/// Build `order` as given. Callers have already resolved the names.
pub(crate) fn build_sequence<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    order: &[RepoName],
    clean: bool,
    output: OutputMode,
    progress: &mut dyn Progress,
) -> BuildReport {
    let mut report = Report::default();
    let mut aborted = None;

    let visited = ctx.strategy.visit(order, &mut |name| {
        let Some(descriptor) = ctx.descriptor(name) else {
            report.record(name.clone(), RepoOutcome::Missing);
            return Flow::Continue;
        };

        progress.started(Action::Build, name);
        let outcome = build_one(ctx, descriptor, clean, output);
        info!(repo = %name, outcome = outcome.label(), "build finished");
        progress.finished(Action::Build, name, &outcome);

        let stop = descriptor.core && outcome.is_failure();
        report.record(name.clone(), outcome);
        if stop {
            aborted = Some(name.clone());
            Flow::Stop
        } else {
            Flow::Continue
        }
    });

    for name in &order[visited..] {
        report.record(name.clone(), RepoOutcome::Skipped);
    }

    BuildReport { report, aborted }
}

fn build_one<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    descriptor: &RepositoryDescriptor,
    clean: bool,
    output: OutputMode,
) -> RepoOutcome {
    let dir = ctx.workspace.clone_dir(descriptor);
    if !dir.is_dir() {
        return RepoOutcome::Missing;
    }

    let manifest = match Manifest::load(&dir) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => return RepoOutcome::NoScript,
        Err(e) => {
            return RepoOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };
    if !manifest.has_script("build") {
        return RepoOutcome::NoScript;
    }

    if clean {
        pre_clean(ctx, &dir, &manifest).logged("pre-build clean", &descriptor.name);
    }

    debug!(repo = %descriptor.name, dir = %dir.display(), "npm run build");
    match ctx.npm().run_script(&dir, "build", output) {
        Ok(out) if out.success() => RepoOutcome::Success,
        Ok(out) => RepoOutcome::Failed {
            reason: failure_reason(out.status, &out.tail(FAILURE_TAIL_LINES)),
        },
        Err(e) => RepoOutcome::Failed {
            reason: e.to_string(),
        },
    }
}

/// Project `clean` script when declared, then remove `dist/`.
fn pre_clean<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    dir: &Path,
    manifest: &Manifest,
) -> StepOutcome {
    let script = if manifest.has_script("clean") {
        match ctx.npm().run_script(dir, "clean", OutputMode::Capture) {
            Ok(out) if out.success() => StepOutcome::Success,
            Ok(out) => StepOutcome::Failed(failure_reason(out.status, &out.tail(5))),
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    } else {
        StepOutcome::Success
    };

    let output_dir = build_output_dir(dir);
    let removal = if output_dir.exists() {
        StepOutcome::from_result(fs::remove_dir_all(&output_dir))
    } else {
        StepOutcome::Success
    };

    script.and(removal)
}

pub(crate) fn failure_reason(status: i32, tail: &str) -> String {
    if tail.is_empty() {
        format!("exit code {status}")
    } else {
        format!("exit code {status}\n{tail}")
    }
}

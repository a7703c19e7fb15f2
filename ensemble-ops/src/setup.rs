//! `setup`: bring a fresh workspace to a built state.
//!
//! clone missing → install → link manifests → reinstall → build.
//! Clone and install failures are fatal; the final build reports per
//! repository like `build` does.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use ensemble_core::RepoName;
use ensemble_exec::{local_reference, LinkChange, Manifest, OutputMode, ProcessRunner};

use crate::build::{build_sequence, BuildReport, FAILURE_TAIL_LINES};
use crate::context::Context;
use crate::error::{io_err, OpsError};
use crate::outcome::RepoOutcome;
use crate::progress::{Action, Progress};

#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Run a full build at the end.
    pub build: bool,
    pub output: OutputMode,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            build: true,
            output: OutputMode::Stream,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub cloned: Vec<RepoName>,
    pub present: Vec<RepoName>,
    /// Manifests rewritten by the link pass, with their changes.
    pub linked: Vec<(RepoName, Vec<LinkChange>)>,
    pub installed: bool,
    pub build: Option<BuildReport>,
}

impl SetupReport {
    pub fn exit_code(&self) -> i32 {
        self.build.as_ref().map_or(0, BuildReport::exit_code)
    }
}

pub fn setup<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    options: &SetupOptions,
    progress: &mut dyn Progress,
) -> Result<SetupReport, OpsError> {
    let mut report = SetupReport::default();

    clone_missing(ctx, &mut report, progress)?;
    report.installed = install_root(ctx, progress)?;

    progress.phase("linking local packages");
    report.linked = link_manifests(ctx, progress)?;

    install_root(ctx, progress)?;

    if options.build {
        progress.phase("building all repositories");
        report.build = Some(build_sequence(
            ctx,
            ctx.registry.build_order(),
            false,
            options.output,
            progress,
        ));
    }
    Ok(report)
}

fn clone_missing<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    report: &mut SetupReport,
    progress: &mut dyn Progress,
) -> Result<(), OpsError> {
    let projects = ctx.workspace.projects_dir();
    fs::create_dir_all(&projects).map_err(|e| io_err(&projects, e))?;
    let git = ctx.git();

    for descriptor in ctx.registry.ordered() {
        let dest = ctx.workspace.clone_dir(descriptor);
        if ctx.workspace.is_cloned(descriptor) {
            debug!(repo = %descriptor.name, "already cloned");
            report.present.push(descriptor.name.clone());
            continue;
        }
        if dest.is_dir() {
            if !is_empty_dir(&dest) {
                warn!(
                    repo = %descriptor.name,
                    dir = %dest.display(),
                    "directory exists but is not a git checkout; leaving it alone"
                );
                report.present.push(descriptor.name.clone());
                continue;
            }
            warn!(repo = %descriptor.name, "empty clone directory, cloning again");
        }

        progress.started(Action::Clone, &descriptor.name);
        let result = git.clone_repo(
            &ctx.workspace.root,
            &descriptor.url,
            &descriptor.branch,
            &dest,
        );
        let reason = match result {
            Ok(out) if out.success() => None,
            Ok(out) => Some(format!("exit code {}: {}", out.status, out.tail(5))),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = reason {
            progress.finished(
                Action::Clone,
                &descriptor.name,
                &RepoOutcome::Failed {
                    reason: reason.clone(),
                },
            );
            return Err(OpsError::CloneFailed {
                repo: descriptor.name.clone(),
                reason,
            });
        }
        progress.finished(Action::Clone, &descriptor.name, &RepoOutcome::Success);
        report.cloned.push(descriptor.name.clone());
    }
    Ok(())
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

/// `npm install` at the workspace root when it has a manifest.
///
/// Returns whether an install ran. A failed install is fatal.
pub(crate) fn install_root<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    progress: &mut dyn Progress,
) -> Result<bool, OpsError> {
    let root = &ctx.workspace.root;
    if !ctx.workspace.root_manifest().is_file() {
        debug!(root = %root.display(), "no root manifest, skipping install");
        return Ok(false);
    }

    progress.phase("installing workspace dependencies");
    let out = ctx.npm().install(root)?;
    if !out.success() {
        return Err(OpsError::InstallFailed {
            cwd: root.clone(),
            reason: format!("exit code {}: {}", out.status, out.tail(FAILURE_TAIL_LINES)),
        });
    }
    Ok(true)
}

/// Point every dependency on a managed sibling at its local clone.
pub fn link_manifests<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    progress: &mut dyn Progress,
) -> Result<Vec<(RepoName, Vec<LinkChange>)>, OpsError> {
    let mut manifests = Vec::new();
    let mut targets = BTreeMap::new();
    for descriptor in ctx.registry.ordered() {
        let dir = ctx.workspace.clone_dir(descriptor);
        if !dir.is_dir() {
            continue;
        }
        if let Some(manifest) = Manifest::load(&dir)? {
            if let Some(package) = manifest.name() {
                targets.insert(package.to_string(), local_reference(&descriptor.directory));
            }
            manifests.push((descriptor.name.clone(), manifest));
        }
    }

    let mut linked = Vec::new();
    for (name, mut manifest) in manifests {
        progress.started(Action::Link, &name);
        let changes = manifest.link_local(&targets);
        if changes.is_empty() {
            progress.finished(Action::Link, &name, &RepoOutcome::UpToDate);
            continue;
        }
        if let Err(e) = manifest.save() {
            progress.finished(
                Action::Link,
                &name,
                &RepoOutcome::Failed {
                    reason: e.to_string(),
                },
            );
            return Err(e.into());
        }
        info!(repo = %name, changes = changes.len(), "manifest linked");
        progress.finished(Action::Link, &name, &RepoOutcome::Success);
        linked.push((name, changes));
    }
    Ok(linked)
}

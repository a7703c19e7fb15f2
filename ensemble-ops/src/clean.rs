//! `clean`: remove build artifacts, and in deep mode installed dependencies.
//!
//! The path set is computed before anything runs, so `--dry-run` reports
//! exactly what a real run would remove and touches nothing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use ensemble_core::RepoName;
use ensemble_exec::{Manifest, OutputMode, ProcessRunner};

use crate::context::Context;
use crate::error::{io_err, OpsError};
use crate::outcome::{RepoOutcome, StepOutcome};
use crate::progress::{Action, Progress};
use crate::strategy::Flow;

pub const ARTIFACT_DIRS: [&str; 5] = ["dist", "build", "tmp", "coverage", ".nyc_output"];
pub const ARTIFACT_EXTENSIONS: [&str; 1] = ["log"];
pub const DEEP_PATHS: [&str; 4] = [
    "node_modules",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];
pub const ROOT_DEEP_PATHS: [&str; 2] = ["node_modules", "package-lock.json"];

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub selection: Vec<RepoName>,
    pub deep: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanEntry {
    pub name: RepoName,
    pub paths: Vec<PathBuf>,
    pub bytes: u64,
    /// `None` when no script ran (none declared, dry run, or missing clone).
    pub script: Option<StepOutcome>,
    pub failures: Vec<(PathBuf, String)>,
    pub missing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub dry_run: bool,
    pub projects: Vec<CleanEntry>,
    /// Workspace-root paths, deep mode over the full workspace only.
    pub root_paths: Vec<PathBuf>,
    pub root_bytes: u64,
    pub root_failures: Vec<(PathBuf, String)>,
}

impl CleanReport {
    pub fn total_bytes(&self) -> u64 {
        self.root_bytes + self.projects.iter().map(|p| p.bytes).sum::<u64>()
    }

    pub fn path_count(&self) -> usize {
        self.root_paths.len() + self.projects.iter().map(|p| p.paths.len()).sum::<usize>()
    }
}

/// Existing artifact paths directly under `dir`, sorted.
pub fn clean_targets(dir: &Path, deep: bool) -> Result<Vec<PathBuf>, OpsError> {
    let mut targets = Vec::new();
    for name in ARTIFACT_DIRS {
        push_existing(&mut targets, dir.join(name));
    }
    if deep {
        for name in DEEP_PATHS {
            push_existing(&mut targets, dir.join(name));
        }
    }

    let entries = fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ARTIFACT_EXTENSIONS.contains(&ext));
        if is_file && matches {
            targets.push(path);
        }
    }

    targets.sort();
    targets.dedup();
    Ok(targets)
}

fn push_existing(targets: &mut Vec<PathBuf>, path: PathBuf) {
    if fs::symlink_metadata(&path).is_ok() {
        targets.push(path);
    }
}

/// Bytes under `path`. Symlinks count as themselves and are not followed.
pub fn disk_usage(path: &Path) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if !meta.is_dir() {
        return meta.len();
    }
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| disk_usage(&entry.path()))
        .sum()
}

/// Already-gone paths count as removed.
fn remove(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Delete `paths`, collecting failures instead of stopping.
fn remove_all(paths: &[PathBuf]) -> Vec<(PathBuf, String)> {
    let mut failures = Vec::new();
    for path in paths {
        debug!(path = %path.display(), "removing");
        if let Err(e) = remove(path) {
            warn!(path = %path.display(), error = %e, "failed to remove");
            failures.push((path.clone(), e.to_string()));
        }
    }
    failures
}

pub fn clean<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    options: &CleanOptions,
    progress: &mut dyn Progress,
) -> Result<CleanReport, OpsError> {
    let order = ctx.registry.select(&options.selection)?;
    let mut report = CleanReport {
        dry_run: options.dry_run,
        ..CleanReport::default()
    };
    let mut fatal = None;

    ctx.strategy.visit(&order, &mut |name| {
        let Some(descriptor) = ctx.descriptor(name) else {
            return Flow::Continue;
        };
        progress.started(Action::Clean, name);

        let dir = ctx.workspace.clone_dir(descriptor);
        if !dir.is_dir() {
            progress.finished(Action::Clean, name, &RepoOutcome::Missing);
            report.projects.push(CleanEntry {
                name: name.clone(),
                paths: Vec::new(),
                bytes: 0,
                script: None,
                failures: Vec::new(),
                missing: true,
            });
            return Flow::Continue;
        }

        // Collected before the clean script so both modes report the same set.
        let paths = match clean_targets(&dir, options.deep) {
            Ok(paths) => paths,
            Err(e) => {
                fatal = Some(e);
                return Flow::Stop;
            }
        };
        let bytes: u64 = paths.iter().map(|p| disk_usage(p)).sum();

        let script = if options.dry_run {
            None
        } else {
            run_clean_script(ctx, &dir).map(|outcome| outcome.logged("clean script", name))
        };
        let failures = if options.dry_run {
            Vec::new()
        } else {
            remove_all(&paths)
        };

        info!(repo = %name, paths = paths.len(), bytes, dry_run = options.dry_run, "cleaned");
        let outcome = if failures.is_empty() {
            RepoOutcome::Success
        } else {
            RepoOutcome::Failed {
                reason: format!("{} path(s) could not be removed", failures.len()),
            }
        };
        progress.finished(Action::Clean, name, &outcome);

        report.projects.push(CleanEntry {
            name: name.clone(),
            paths,
            bytes,
            script,
            failures,
            missing: false,
        });
        Flow::Continue
    });

    if let Some(e) = fatal {
        return Err(e);
    }

    if options.deep && options.selection.is_empty() {
        let root = &ctx.workspace.root;
        for name in ROOT_DEEP_PATHS {
            push_existing(&mut report.root_paths, root.join(name));
        }
        report.root_bytes = report.root_paths.iter().map(|p| disk_usage(p)).sum();
        if !options.dry_run {
            progress.phase("removing workspace dependencies");
            report.root_failures = remove_all(&report.root_paths);
        }
    }

    Ok(report)
}

/// Run the project's `clean` script when it declares one.
fn run_clean_script<R: ProcessRunner + ?Sized>(
    ctx: &Context<'_, R>,
    dir: &Path,
) -> Option<StepOutcome> {
    match Manifest::load(dir) {
        Ok(Some(manifest)) if manifest.has_script("clean") => {}
        Ok(_) => return None,
        Err(e) => return Some(StepOutcome::Failed(e.to_string())),
    }
    let outcome = match ctx.npm().run_script(dir, "clean", OutputMode::Capture) {
        Ok(out) if out.success() => StepOutcome::Success,
        Ok(out) => StepOutcome::Failed(format!("exit code {}", out.status)),
        Err(e) => StepOutcome::Failed(e.to_string()),
    };
    Some(outcome)
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn targets_include_logs_but_not_sources() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("dist")).unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("npm-debug.log"), "x").unwrap();
        fs::write(dir.path().join("index.ts"), "x").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();

        let shallow = clean_targets(dir.path(), false).unwrap();
        assert_eq!(
            shallow,
            vec![dir.path().join("dist"), dir.path().join("npm-debug.log")]
        );

        let deep = clean_targets(dir.path(), true).unwrap();
        assert!(deep.contains(&dir.path().join("node_modules")));
    }

    #[test]
    fn disk_usage_sums_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dist/nested")).unwrap();
        fs::write(dir.path().join("dist/a.js"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("dist/nested/b.js"), vec![0u8; 28]).unwrap();
        assert_eq!(disk_usage(&dir.path().join("dist")), 128);
        assert_eq!(disk_usage(&dir.path().join("absent")), 0);
    }

    #[test]
    fn removing_an_already_deleted_path_is_not_a_failure() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("coverage");
        fs::create_dir(&present).unwrap();
        let gone = dir.path().join("dist");

        let failures = remove_all(&[gone, present.clone()]);

        assert!(failures.is_empty(), "{failures:?}");
        assert!(!present.exists());
    }

    #[test]
    fn format_bytes_picks_a_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}

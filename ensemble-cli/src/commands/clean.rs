//! `ensemble clean` — remove build artifacts and, with `--deep`, dependencies.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use ensemble_exec::SystemRunner;
use ensemble_ops::clean::{self, format_bytes, CleanEntry};
use ensemble_ops::{CleanOptions, CleanReport, Context, Silent, StepOutcome, WorkspaceLock};

use crate::{selection, GlobalArgs};

/// Arguments for `ensemble clean`.
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Clean only these projects.
    #[arg(value_name = "PROJECT")]
    pub projects: Vec<String>,

    /// Also remove installed dependencies and lockfiles.
    #[arg(long)]
    pub deep: bool,

    /// List what would be removed without touching anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<i32> {
        let session = global.session()?;
        let _lock = if self.dry_run {
            None
        } else {
            Some(WorkspaceLock::acquire(&session.workspace)?)
        };
        let runner = SystemRunner;
        let ctx = Context::new(&session.workspace, &session.registry, &runner);
        let options = CleanOptions {
            selection: selection(&self.projects),
            deep: self.deep,
            dry_run: self.dry_run,
        };

        let report = clean::clean(&ctx, &options, &mut Silent)?;
        print_clean(&report, &session.workspace.root);

        let failed = !report.root_failures.is_empty()
            || report.projects.iter().any(|p| !p.failures.is_empty());
        Ok(if failed { 1 } else { 0 })
    }
}

fn print_clean(report: &CleanReport, root: &Path) {
    let verb = if report.dry_run { "would remove" } else { "removed" };
    if report.dry_run {
        println!("{}", "Dry run: nothing will be deleted.".yellow().bold());
    }

    for entry in &report.projects {
        print_entry(entry, verb, root);
    }

    if !report.root_paths.is_empty() {
        println!(
            "🧹 {} {verb} {} path(s), {}",
            "workspace root".bold(),
            report.root_paths.len(),
            format_bytes(report.root_bytes)
        );
        if report.dry_run {
            for path in &report.root_paths {
                println!("     {}", display_relative(path, root));
            }
        }
        for (path, reason) in &report.root_failures {
            println!("   {} {}: {reason}", "✗".red(), display_relative(path, root));
        }
    }

    println!();
    println!(
        "{} {} path(s), {} {}",
        if report.dry_run { "Would reclaim" } else { "Reclaimed" },
        report.path_count(),
        format_bytes(report.total_bytes()),
        if report.dry_run { "(dry run)" } else { "" }
    );
}

fn print_entry(entry: &CleanEntry, verb: &str, root: &Path) {
    if entry.missing {
        println!("⚠️  {} not cloned, skipped", entry.name.as_str().bold());
        return;
    }
    if entry.paths.is_empty() {
        println!("🧹 {} already clean", entry.name.as_str().bold());
    } else {
        println!(
            "🧹 {} {verb} {} path(s), {}",
            entry.name.as_str().bold(),
            entry.paths.len(),
            format_bytes(entry.bytes)
        );
    }
    if let Some(StepOutcome::Failed(reason)) = &entry.script {
        println!("   {} clean script failed: {reason}", "!".yellow());
    }
    for path in &entry.paths {
        if entry.failures.iter().any(|(failed, _)| failed == path) {
            continue;
        }
        println!("     {}", display_relative(path, root).bright_black());
    }
    for (path, reason) in &entry.failures {
        println!("   {} {}: {reason}", "✗".red(), display_relative(path, root));
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

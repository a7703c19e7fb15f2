//! `ensemble update` — pull every clone and rebuild what changed.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use ensemble_exec::{OutputMode, SystemRunner};
use ensemble_ops::{update, Context, Invalidation, UpdateOptions, WorkspaceLock};

use crate::console::{print_report, ConsoleProgress};
use crate::GlobalArgs;

/// Arguments for `ensemble update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Clean each rebuilt project first.
    #[arg(long)]
    pub clean: bool,

    /// Report how far behind each clone is without pulling.
    #[arg(long)]
    pub dry_run: bool,

    /// Pull only; skip reinstall and rebuild.
    #[arg(long)]
    pub no_build: bool,

    /// Rebuild only direct dependents of updated repositories.
    #[arg(long)]
    pub shallow: bool,
}

impl UpdateArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<i32> {
        let session = global.session()?;
        let _lock = if self.dry_run {
            None
        } else {
            Some(WorkspaceLock::acquire(&session.workspace)?)
        };
        let runner = SystemRunner;
        let ctx = Context::new(&session.workspace, &session.registry, &runner);
        let options = UpdateOptions {
            dry_run: self.dry_run,
            clean: self.clean,
            build: !self.no_build,
            invalidation: if self.shallow {
                Invalidation::Shallow
            } else {
                Invalidation::Transitive
            },
            output: OutputMode::Stream,
        };

        let report = update::update(&ctx, &options, &mut ConsoleProgress)?;

        print_report(
            if report.dry_run { "Update summary (dry run)" } else { "Update summary" },
            &report.report,
        );

        let updated = report.updated();
        if updated.is_empty() {
            println!("{}", "Everything is up to date.".green());
            return Ok(report.exit_code());
        }
        if !report.rebuild.is_empty() {
            let names: Vec<&str> = report.rebuild.iter().map(|n| n.as_str()).collect();
            let verb = if report.dry_run || self.no_build {
                "would rebuild"
            } else {
                "rebuilt"
            };
            println!("{verb}: {}", names.join(" → "));
        }
        if report.reinstalled {
            println!("📦 workspace dependencies reinstalled");
        }
        if let Some(build) = &report.build {
            print_report("Rebuild summary", &build.report);
            if let Some(core) = &build.aborted {
                println!(
                    "{} core repository '{core}' failed; remaining builds were not attempted",
                    "aborted:".red().bold()
                );
            }
        }
        Ok(report.exit_code())
    }
}

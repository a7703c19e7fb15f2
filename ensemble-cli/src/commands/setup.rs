//! `ensemble setup` — bring a fresh workspace to a built state.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use ensemble_exec::{OutputMode, SystemRunner};
use ensemble_ops::{setup, Context, SetupOptions, WorkspaceLock};

use crate::console::{print_report, ConsoleProgress};
use crate::GlobalArgs;

/// Arguments for `ensemble setup`.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Stop after linking; do not build.
    #[arg(long)]
    pub no_build: bool,
}

impl SetupArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<i32> {
        let session = global.session()?;
        let _lock = WorkspaceLock::acquire(&session.workspace)?;
        let runner = SystemRunner;
        let ctx = Context::new(&session.workspace, &session.registry, &runner);
        let options = SetupOptions {
            build: !self.no_build,
            output: OutputMode::Stream,
        };

        let report = setup::setup(&ctx, &options, &mut ConsoleProgress).context("setup aborted")?;

        println!();
        println!(
            "{} {} cloned, {} already present",
            "✓".green().bold(),
            report.cloned.len(),
            report.present.len()
        );
        for (name, changes) in &report.linked {
            println!("  🔗 {name}: {} dependency reference(s) linked", changes.len());
            for change in changes {
                println!(
                    "     {} {}: {} → {}",
                    change.section.bright_black(),
                    change.package,
                    change.from,
                    change.to
                );
            }
        }
        if let Some(build) = &report.build {
            print_report("Build summary", &build.report);
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

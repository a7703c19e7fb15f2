//! `ensemble build` — run build scripts in dependency order.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use ensemble_exec::{OutputMode, SystemRunner};
use ensemble_ops::{build, BuildOptions, Context, WorkspaceLock};

use crate::console::{print_report, ConsoleProgress};
use crate::{selection, GlobalArgs};

/// Arguments for `ensemble build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Build only these projects (still in build order).
    #[arg(value_name = "PROJECT")]
    pub projects: Vec<String>,

    /// Clean each project before building it.
    #[arg(long)]
    pub clean: bool,
}

impl BuildArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<i32> {
        let session = global.session()?;
        let _lock = WorkspaceLock::acquire(&session.workspace)?;
        let runner = SystemRunner;
        let ctx = Context::new(&session.workspace, &session.registry, &runner);
        let options = BuildOptions {
            selection: selection(&self.projects),
            clean: self.clean,
            output: OutputMode::Stream,
        };

        let report = build::build(&ctx, &options, &mut ConsoleProgress)?;

        print_report("Build summary", &report.report);
        if let Some(core) = &report.aborted {
            println!(
                "{} core repository '{core}' failed; remaining builds were not attempted",
                "aborted:".red().bold()
            );
        }
        Ok(report.exit_code())
    }
}

//! `ensemble watch` — rebuild a repository and its dependents on change.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use ensemble_core::{Registry, RepoName, Workspace};
use ensemble_exec::{OutputMode, SystemRunner};
use ensemble_ops::{build_affected, BuildReport, Context, OpsError, WorkspaceLock};
use ensemble_watch::{start_blocking, Rebuilder, WatchConfig};

use crate::console::{print_report, ConsoleProgress};
use crate::{selection, GlobalArgs};

/// Arguments for `ensemble watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Watch only these projects (default: every cloned repository).
    #[arg(value_name = "PROJECT")]
    pub projects: Vec<String>,
}

impl WatchArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<i32> {
        let session = global.session()?;
        let config = WatchConfig::for_workspace(
            &session.workspace,
            &session.registry,
            &selection(&self.projects),
        )?;

        println!("{}", "Watching for changes (Ctrl-C to stop)".bold());
        for (name, dir) in &config.roots {
            println!("  👀 {name}  {}", dir.display().to_string().bright_black());
        }

        let rebuilder = ConsoleRebuilder {
            workspace: session.workspace,
            registry: session.registry,
        };
        start_blocking(config, Arc::new(rebuilder)).context("watch mode exited with error")?;
        Ok(0)
    }
}

/// Builds the changed repository and its dependents, printing as it goes.
struct ConsoleRebuilder {
    workspace: Workspace,
    registry: Registry,
}

impl Rebuilder for ConsoleRebuilder {
    fn rebuild(&self, changed: &RepoName) -> Result<BuildReport, OpsError> {
        let _lock = WorkspaceLock::acquire(&self.workspace)?;
        let runner = SystemRunner;
        let ctx = Context::new(&self.workspace, &self.registry, &runner);

        println!();
        println!("{} change detected in {}", "▸".cyan().bold(), changed.as_str().bold());
        let report = build_affected(&ctx, changed, OutputMode::Capture, &mut ConsoleProgress);
        print_report("Rebuild summary", &report.report);
        Ok(report)
    }
}

//! `ensemble test` — run test scripts.

use anyhow::Result;
use clap::Args;

use ensemble_exec::SystemRunner;
use ensemble_ops::{test, Context, TestOptions, WorkspaceLock};

use crate::console::{print_report, ConsoleProgress};
use crate::{selection, GlobalArgs};

/// Arguments for `ensemble test`.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Test only these projects.
    #[arg(value_name = "PROJECT")]
    pub projects: Vec<String>,

    /// Stream test output live instead of showing it only for failures.
    #[arg(long)]
    pub verbose: bool,

    /// Stop at the first failing project.
    #[arg(long)]
    pub fail_fast: bool,
}

impl TestArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<i32> {
        let session = global.session()?;
        let _lock = WorkspaceLock::acquire(&session.workspace)?;
        let runner = SystemRunner;
        let ctx = Context::new(&session.workspace, &session.registry, &runner);
        let options = TestOptions {
            selection: selection(&self.projects),
            verbose: self.verbose,
            fail_fast: self.fail_fast,
        };

        let report = test::test(&ctx, &options, &mut ConsoleProgress)?;

        print_report("Test summary", &report.report);
        if let Some(name) = &report.stopped_at {
            println!("stopped after '{name}' (--fail-fast)");
        }
        Ok(report.exit_code())
    }
}

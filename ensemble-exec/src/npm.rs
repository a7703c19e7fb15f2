//! `npm` invocations: workspace installs and per-project scripts.

use std::path::Path;

use crate::error::ExecError;
use crate::runner::{Invocation, OutputMode, ProcessOutput, ProcessRunner};

/// `npm` bound to a runner and program name.
pub struct Npm<'r, R: ProcessRunner + ?Sized> {
    runner: &'r R,
    program: &'r str,
}

impl<'r, R: ProcessRunner + ?Sized> Npm<'r, R> {
    pub fn new(runner: &'r R, program: &'r str) -> Self {
        Self { runner, program }
    }

    /// `npm install` in `cwd`. Output is streamed; installs are long and the
    /// operator wants to see progress.
    pub fn install(&self, cwd: &Path) -> Result<ProcessOutput, ExecError> {
        self.runner.run(
            &Invocation::new(self.program, cwd)
                .arg("install")
                .output(OutputMode::Stream),
        )
    }

    /// `npm run <script>` in `cwd`.
    pub fn run_script(
        &self,
        cwd: &Path,
        script: &str,
        output: OutputMode,
    ) -> Result<ProcessOutput, ExecError> {
        self.runner.run(
            &Invocation::new(self.program, cwd)
                .args(["run", script])
                .output(output),
        )
    }
}

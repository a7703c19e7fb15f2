//! Blocking process runner.
//!
//! Every shelled-out command carries its working directory in the
//! [`Invocation`]; the orchestrator never changes its own cwd.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ExecError;

/// Whether child output is captured for later reporting or streamed live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Capture,
    /// Inherit the parent's stdout/stderr. Captured fields stay empty.
    Stream,
}

/// A single command to run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub output: OutputMode,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            output: OutputMode::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished child.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the child was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Last `lines` lines of stderr, falling back to stdout when stderr is empty.
    pub fn tail(&self, lines: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let all: Vec<&str> = source.trim_end().lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }

    /// Trimmed stdout; most git plumbing prints one value per line.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Runs child processes to completion.
///
/// The seam between orchestration logic and the operating system: commands
/// are written against this trait and tests inject scripted runners.
pub trait ProcessRunner {
    /// Run `invocation` and wait for it. `Err` only when the program could not
    /// be started; a non-zero exit is a successful `Ok` with that status.
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError>;

    /// Run and require exit code zero.
    fn run_checked(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError> {
        let output = self.run(invocation)?;
        if output.success() {
            Ok(output)
        } else {
            Err(ExecError::Failed {
                command: invocation.to_string(),
                status: output.status,
                stderr: output.tail(5),
            })
        }
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError> {
        (**self).run(invocation)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for Box<R> {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError> {
        (**self).run(invocation)
    }
}

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError> {
        tracing::debug!(command = %invocation, cwd = %invocation.cwd.display(), "running");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null());

        let spawn_err = |source| ExecError::Spawn {
            command: invocation.to_string(),
            cwd: invocation.cwd.clone(),
            source,
        };

        let output = match invocation.output {
            OutputMode::Stream => {
                let status = command
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .map_err(spawn_err)?;
                ProcessOutput {
                    status: status.code().unwrap_or(-1),
                    ..ProcessOutput::default()
                }
            }
            OutputMode::Capture => {
                let output = command.output().map_err(spawn_err)?;
                ProcessOutput {
                    status: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            }
        };

        tracing::debug!(command = %invocation, status = output.status, "finished");
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new("npm", "/tmp").args(["run", "build"]);
        assert_eq!(inv.to_string(), "npm run build");
    }

    #[rstest]
    #[case::stderr_wins("ok\n", "a\nb\nc\n", 2, "b\nc")]
    #[case::blank_stderr_falls_back("x\ny\n", "  \n", 5, "x\ny")]
    #[case::fewer_lines_than_asked("", "only\n", 20, "only")]
    #[case::nothing_printed("", "", 3, "")]
    fn tail_cases(
        #[case] stdout: &str,
        #[case] stderr: &str,
        #[case] lines: usize,
        #[case] expected: &str,
    ) {
        let out = ProcessOutput {
            status: 1,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };
        assert_eq!(out.tail(lines), expected);
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_uses_explicit_cwd() {
        let dir = TempDir::new().expect("tempdir");
        let canonical = dir.path().canonicalize().expect("canonicalize");
        let out = SystemRunner
            .run(&Invocation::new("pwd", dir.path()))
            .expect("run pwd");
        assert!(out.success());
        assert_eq!(PathBuf::from(out.stdout_trimmed()), canonical);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_ok_with_status() {
        let dir = TempDir::new().expect("tempdir");
        let out = SystemRunner
            .run(&Invocation::new("sh", dir.path()).args(["-c", "echo boom >&2; exit 3"]))
            .expect("run sh");
        assert_eq!(out.status, 3);
        assert_eq!(out.tail(1), "boom");
    }

    #[cfg(unix)]
    #[test]
    fn run_checked_turns_failure_into_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = SystemRunner
            .run_checked(&Invocation::new("sh", dir.path()).args(["-c", "exit 1"]))
            .unwrap_err();
        assert!(matches!(err, ExecError::Failed { status: 1, .. }), "got: {err}");
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = SystemRunner
            .run(&Invocation::new("ensemble-no-such-program", dir.path()))
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }), "got: {err}");
    }
}

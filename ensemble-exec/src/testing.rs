//! Scripted [`ProcessRunner`] for tests (feature `test-support`).
//!
//! Records every invocation and answers from rules; the most recently added
//! matching rule wins, unmatched invocations succeed with empty output.

use std::cell::RefCell;
use std::path::Path;

use crate::error::ExecError;
use crate::runner::{Invocation, ProcessOutput, ProcessRunner};

type Matcher = Box<dyn Fn(&Invocation) -> bool>;
type Handler = Box<dyn Fn(&Invocation) -> Result<ProcessOutput, ExecError>>;

#[derive(Default)]
pub struct ScriptedRunner {
    rules: RefCell<Vec<(Matcher, Handler)>>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer matching invocations with `handler`.
    pub fn on<M, H>(&self, matcher: M, handler: H) -> &Self
    where
        M: Fn(&Invocation) -> bool + 'static,
        H: Fn(&Invocation) -> Result<ProcessOutput, ExecError> + 'static,
    {
        self.rules
            .borrow_mut()
            .push((Box::new(matcher), Box::new(handler)));
        self
    }

    /// Matching invocations exit with `status`.
    pub fn exit_with<M>(&self, matcher: M, status: i32) -> &Self
    where
        M: Fn(&Invocation) -> bool + 'static,
    {
        self.on(matcher, move |_| {
            Ok(ProcessOutput {
                status,
                stdout: String::new(),
                stderr: format!("scripted exit {status}"),
            })
        })
    }

    /// Matching invocations succeed printing `stdout`.
    pub fn stdout<M>(&self, matcher: M, stdout: &str) -> &Self
    where
        M: Fn(&Invocation) -> bool + 'static,
    {
        let stdout = stdout.to_string();
        self.on(matcher, move |_| {
            Ok(ProcessOutput {
                status: 0,
                stdout: stdout.clone(),
                stderr: String::new(),
            })
        })
    }

    /// Matching invocations fail to spawn.
    pub fn spawn_error<M>(&self, matcher: M) -> &Self
    where
        M: Fn(&Invocation) -> bool + 'static,
    {
        self.on(matcher, |inv| {
            Err(ExecError::Spawn {
                command: inv.to_string(),
                cwd: inv.cwd.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted"),
            })
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Working directories of invocations whose display form equals `command`.
    pub fn dirs_for(&self, command: &str) -> Vec<std::path::PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter(|inv| inv.to_string() == command)
            .map(|inv| inv.cwd.clone())
            .collect()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError> {
        self.calls.borrow_mut().push(invocation.clone());
        let rules = self.rules.borrow();
        for (matcher, handler) in rules.iter().rev() {
            if matcher(invocation) {
                return handler(invocation);
            }
        }
        Ok(ProcessOutput::default())
    }
}

/// Matcher: display form equals `command` and cwd ends with `dir`.
pub fn command_in(command: &'static str, dir: &'static str) -> impl Fn(&Invocation) -> bool {
    move |inv| inv.to_string() == command && inv.cwd.ends_with(Path::new(dir))
}

/// Matcher: display form equals `command`, any cwd.
pub fn command(command: &'static str) -> impl Fn(&Invocation) -> bool {
    move |inv| inv.to_string() == command
}

/// Matcher: argument list starts with `prefix`.
pub fn args_start_with(prefix: &'static [&'static str]) -> impl Fn(&Invocation) -> bool {
    move |inv| {
        inv.args.len() >= prefix.len() && inv.args.iter().zip(prefix).all(|(a, p)| a.as_str() == *p)
    }
}

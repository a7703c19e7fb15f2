//! Thin wrappers over the `git` commands the orchestrator needs.
//!
//! Each method builds one [`Invocation`] with an explicit working directory
//! and interprets its output; nothing here retries or recovers.

use std::path::Path;

use serde::Serialize;

use crate::error::ExecError;
use crate::runner::{Invocation, ProcessOutput, ProcessRunner};

/// `git` bound to a runner and program name.
pub struct Git<'r, R: ProcessRunner + ?Sized> {
    runner: &'r R,
    program: &'r str,
}

/// Last commit on `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub hash: String,
    pub subject: String,
}

impl<'r, R: ProcessRunner + ?Sized> Git<'r, R> {
    pub fn new(runner: &'r R, program: &'r str) -> Self {
        Self { runner, program }
    }

    fn invocation(&self, cwd: &Path) -> Invocation {
        Invocation::new(self.program, cwd)
    }

    /// `git clone --branch <branch> <url> <dest>` run from `cwd`.
    ///
    /// Returns the raw output; the caller decides whether failure is fatal.
    pub fn clone_repo(
        &self,
        cwd: &Path,
        url: &str,
        branch: &str,
        dest: &Path,
    ) -> Result<ProcessOutput, ExecError> {
        self.runner.run(
            &self
                .invocation(cwd)
                .args(["clone", "--branch", branch, url])
                .arg(dest.to_string_lossy()),
        )
    }

    pub fn current_branch(&self, repo: &Path) -> Result<String, ExecError> {
        let out = self
            .runner
            .run_checked(&self.invocation(repo).args(["rev-parse", "--abbrev-ref", "HEAD"]))?;
        Ok(out.stdout_trimmed().to_string())
    }

    pub fn head(&self, repo: &Path) -> Result<String, ExecError> {
        let out = self
            .runner
            .run_checked(&self.invocation(repo).args(["rev-parse", "HEAD"]))?;
        Ok(out.stdout_trimmed().to_string())
    }

    /// `git log -1 --format=%h%x09%s` → short hash + subject.
    pub fn last_commit(&self, repo: &Path) -> Result<CommitSummary, ExecError> {
        let out = self
            .runner
            .run_checked(&self.invocation(repo).args(["log", "-1", "--format=%h%x09%s"]))?;
        Ok(parse_commit_line(out.stdout_trimmed()))
    }

    /// `true` when `git status --porcelain` reports anything.
    pub fn is_dirty(&self, repo: &Path) -> Result<bool, ExecError> {
        let out = self
            .runner
            .run_checked(&self.invocation(repo).args(["status", "--porcelain"]))?;
        Ok(!out.stdout_trimmed().is_empty())
    }

    /// `git fetch --dry-run`; network-dependent, callers treat it as best-effort.
    pub fn fetch_dry_run(&self, repo: &Path) -> Result<(), ExecError> {
        self.runner
            .run_checked(&self.invocation(repo).args(["fetch", "--dry-run"]))
            .map(|_| ())
    }

    /// `git fetch origin <branch>`.
    pub fn fetch(&self, repo: &Path, branch: &str) -> Result<(), ExecError> {
        self.runner
            .run_checked(&self.invocation(repo).args(["fetch", "origin", branch]))
            .map(|_| ())
    }

    /// `git pull --ff-only origin <branch>`.
    pub fn pull(&self, repo: &Path, branch: &str) -> Result<(), ExecError> {
        self.runner
            .run_checked(
                &self
                    .invocation(repo)
                    .args(["pull", "--ff-only", "origin", branch]),
            )
            .map(|_| ())
    }

    /// Commits on the upstream branch missing locally (`HEAD..@{u}`).
    pub fn behind_count(&self, repo: &Path) -> Result<u32, ExecError> {
        self.rev_count(repo, "HEAD..@{u}")
    }

    /// Local commits not yet on the upstream branch (`@{u}..HEAD`).
    pub fn ahead_count(&self, repo: &Path) -> Result<u32, ExecError> {
        self.rev_count(repo, "@{u}..HEAD")
    }

    fn rev_count(&self, repo: &Path, range: &str) -> Result<u32, ExecError> {
        let out = self
            .runner
            .run_checked(&self.invocation(repo).args(["rev-list", "--count", range]))?;
        Ok(out.stdout_trimmed().parse().unwrap_or(0))
    }
}

fn parse_commit_line(line: &str) -> CommitSummary {
    match line.split_once('\t') {
        Some((hash, subject)) => CommitSummary {
            hash: hash.to_string(),
            subject: subject.to_string(),
        },
        None => CommitSummary {
            hash: line.to_string(),
            subject: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::tab_separated("abc1234\tfix: handle empty build order", "abc1234", "fix: handle empty build order")]
    #[case::no_subject("abc1234", "abc1234", "")]
    #[case::tab_in_subject("abc1234\tdocs:\tindent", "abc1234", "docs:\tindent")]
    fn parse_commit_line_cases(#[case] line: &str, #[case] hash: &str, #[case] subject: &str) {
        let c = parse_commit_line(line);
        assert_eq!(c.hash, hash);
        assert_eq!(c.subject, subject);
    }
}

//! Per-repository outcomes and run reports.

use std::fmt;

use ensemble_core::RepoName;

/// What happened to one repository during one command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    Success,
    /// The command ran and exited non-zero.
    Failed { reason: String },
    /// The command could not be run at all.
    Error { reason: String },
    /// No clone under `projects/`.
    Missing,
    /// No manifest, or the manifest declares no such script.
    NoScript,
    /// Not attempted: an earlier abort or fail-fast stop.
    Skipped,
    Updated { from: String, to: String },
    UpToDate,
    /// Dry-run update: upstream has `behind` new commits.
    WouldUpdate { behind: u32 },
}

impl RepoOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RepoOutcome::Success => "success",
            RepoOutcome::Failed { .. } => "failed",
            RepoOutcome::Error { .. } => "error",
            RepoOutcome::Missing => "missing",
            RepoOutcome::NoScript => "no-script",
            RepoOutcome::Skipped => "skipped",
            RepoOutcome::Updated { .. } => "updated",
            RepoOutcome::UpToDate => "up-to-date",
            RepoOutcome::WouldUpdate { .. } => "would-update",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RepoOutcome::Failed { .. } | RepoOutcome::Error { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            RepoOutcome::Failed { reason } | RepoOutcome::Error { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for RepoOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoOutcome::Updated { from, to } => {
                write!(f, "updated {}..{}", short(from), short(to))
            }
            RepoOutcome::WouldUpdate { behind } => write!(f, "would update ({behind} behind)"),
            other => f.write_str(other.label()),
        }
    }
}

fn short(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

/// Result of a best-effort step. Logged, never escalated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Failed(String),
}

impl StepOutcome {
    pub fn from_result<T, E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => StepOutcome::Success,
            Err(err) => StepOutcome::Failed(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }

    /// Emit a `warn` for a failed step; returns `self` for chaining.
    pub fn logged(self, step: &str, repo: &RepoName) -> Self {
        if let StepOutcome::Failed(reason) = &self {
            tracing::warn!(repo = %repo, step, reason = %reason, "best-effort step failed");
        }
        self
    }

    /// First failure wins.
    pub fn and(self, other: StepOutcome) -> StepOutcome {
        match self {
            StepOutcome::Success => other,
            failed => failed,
        }
    }
}

/// Counts per outcome label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub success: usize,
    pub failed: usize,
    pub error: usize,
    pub missing: usize,
    pub no_script: usize,
    pub skipped: usize,
    pub updated: usize,
    pub up_to_date: usize,
}

/// Ordered per-repository results of one command run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    entries: Vec<(RepoName, RepoOutcome)>,
}

impl Report {
    pub fn record(&mut self, name: RepoName, outcome: RepoOutcome) {
        self.entries.push((name, outcome));
    }

    pub fn entries(&self) -> &[(RepoName, RepoOutcome)] {
        &self.entries
    }

    pub fn get(&self, name: &RepoName) -> Option<&RepoOutcome> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn names_where(&self, pred: impl Fn(&RepoOutcome) -> bool) -> Vec<RepoName> {
        self.entries
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|(_, outcome)| outcome.is_failure())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for (_, outcome) in &self.entries {
            match outcome {
                RepoOutcome::Success => tally.success += 1,
                RepoOutcome::Failed { .. } => tally.failed += 1,
                RepoOutcome::Error { .. } => tally.error += 1,
                RepoOutcome::Missing => tally.missing += 1,
                RepoOutcome::NoScript => tally.no_script += 1,
                RepoOutcome::Skipped => tally.skipped += 1,
                RepoOutcome::Updated { .. } | RepoOutcome::WouldUpdate { .. } => {
                    tally.updated += 1
                }
                RepoOutcome::UpToDate => tally.up_to_date += 1,
            }
        }
        tally
    }
}

//! Error types for ensemble-ops.
//!
//! Only the fatal tier lives here. Recorded failures are
//! [`crate::outcome::RepoOutcome`] values and best-effort failures are
//! [`crate::outcome::StepOutcome`] values; neither ever becomes an `OpsError`.

use std::path::PathBuf;

use thiserror::Error;

use ensemble_core::{ConfigError, RepoName};
use ensemble_exec::ExecError;

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Setup cannot continue without every repository present.
    #[error("failed to clone '{repo}': {reason}")]
    CloneFailed { repo: RepoName, reason: String },

    #[error("dependency install failed in {cwd}: {reason}")]
    InstallFailed { cwd: PathBuf, reason: String },

    #[error("workspace is locked by pid {pid} ({path}); remove the file if that process is gone")]
    LockHeld { path: PathBuf, pid: u32 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`OpsError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> OpsError {
    OpsError::Io {
        path: path.into(),
        source,
    }
}

//! Error types for ensemble-exec.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from spawning processes and reading/writing manifests.
///
/// A child that runs and exits non-zero is *not* an error at this layer; it
/// is reported through [`crate::runner::ProcessOutput::status`].
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be started at all (not on PATH, bad cwd, …).
    #[error("failed to run `{command}` in {cwd}: {source}")]
    Spawn {
        command: String,
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A command whose output is required exited non-zero.
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest at {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`ExecError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ExecError {
    ExecError::Io {
        path: path.into(),
        source,
    }
}

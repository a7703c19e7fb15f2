use std::path::PathBuf;

use thiserror::Error;

/// Error surface for watch mode.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ensemble_core::ConfigError),

    #[error(transparent)]
    Ops(#[from] ensemble_ops::OpsError),

    #[error("no cloned repositories to watch; run `ensemble setup` first")]
    NothingToWatch,

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("watch runtime error: {0}")]
    Runtime(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WatchError {
    WatchError::Io {
        path: path.into(),
        source,
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime and metrics endpoint.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] gitrelay_core::ConfigError),

    #[error("sync error: {0}")]
    Sync(#[from] gitrelay_sync::SyncError),

    #[error("metrics server error: {0}")]
    Metrics(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}

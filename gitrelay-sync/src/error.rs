//! Error types for gitrelay-sync.

use std::path::PathBuf;

use thiserror::Error;

use gitrelay_core::RouteError;

/// All errors that can arise during a pipeline pass. Any of them aborts the
/// pass without committing the change cache.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Object store listing or retrieval failure (transient infrastructure).
    #[error("object store error: {reason}")]
    Store { reason: String },

    /// The listing+fetch stage exceeded its deadline.
    #[error("deadline exceeded during {stage}")]
    Deadline { stage: &'static str },

    /// Private key material could not be read, parsed, or unlocked.
    #[error("key material error: {reason}")]
    KeyMaterial { reason: String },

    /// A bundle failed to decrypt (wrong key or corrupted ciphertext).
    #[error("failed to decrypt object '{key}': {reason}")]
    Decrypt { key: String, reason: String },

    /// A bundle's plaintext was not a well-formed archive of files and
    /// directories.
    #[error("malformed archive in object '{key}': {reason}")]
    ArchiveFormat { key: String, reason: String },

    /// Route metadata could not be decoded from an object key.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// An external git invocation failed.
    #[error("git {action} failed for {destination}: {detail}")]
    GitCommand {
        action: String,
        destination: String,
        detail: String,
    },

    /// A spawned worker task could not be joined.
    #[error("worker join failure during {stage}")]
    Join { stage: &'static str },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

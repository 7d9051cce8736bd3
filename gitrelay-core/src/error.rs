//! Error types for gitrelay-core.

use thiserror::Error;

/// All errors that can arise while decoding route metadata from an object
/// key. Any of these is fatal to the pass that encountered it.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The key (minus extension) was not valid standard base64.
    #[error("object key '{key}' is not valid base64: {source}")]
    Base64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// The decoded key bytes were not UTF-8.
    #[error("decoded object key '{key}' is not UTF-8")]
    NotUtf8 { key: String },

    /// Too few path segments to recover group/project/SHA.
    #[error("object key '{key}' decodes to {found} segment(s); need at least 3")]
    SegmentCount { key: String, found: usize },

    /// The SHA segment was shorter than the 7 characters of a short SHA.
    #[error("object key '{key}' encodes a commit SHA shorter than 7 characters")]
    ShortSha { key: String },
}

/// Errors raised while assembling process configuration. All are fatal at
/// startup and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {name}")]
    MissingEnv { name: &'static str },

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

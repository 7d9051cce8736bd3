//! Gitrelay core library — domain types, route decoding, change cache, config.
//!
//! Public API surface:
//! - [`types`] — pipeline entities ([`RemoteObject`], bundles, archives)
//! - [`route`] — object-key → [`RouteMetadata`] decoding
//! - [`cache`] — [`ChangeCache`] change detection and commit semantics
//! - [`config`] — environment-driven [`Config`]
//! - [`error`] — [`RouteError`], [`ConfigError`]

pub mod cache;
pub mod config;
pub mod error;
pub mod route;
pub mod types;

pub use cache::{ChangeCache, PendingWriter};
pub use config::Config;
pub use error::{ConfigError, RouteError};
pub use types::{
    DecryptedBundle, EncryptedBundle, ExtractedArchive, RemoteObject, RouteMetadata,
};

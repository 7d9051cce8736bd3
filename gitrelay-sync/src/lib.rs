//! # gitrelay-sync
//!
//! The incremental synchronization pipeline: list the bucket, fetch changed
//! objects concurrently, decrypt them concurrently, unpack each bundle into
//! a scratch tree, and publish every extracted repository to its decoded
//! destination. The change cache commits only after a fully successful pass,
//! so a failed pass is always safe to retry from scratch.
//!
//! [`Pipeline::run_pass`] is the canonical entrypoint used by both the CLI
//! and the daemon loop.

pub mod decrypt;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod publish;
pub mod store;

pub use error::SyncError;
pub use pipeline::{PassOutcome, Pipeline, PlannedPush};
pub use publish::{GitPublisher, Publisher};
pub use store::{ObjectStore, S3ObjectStore};

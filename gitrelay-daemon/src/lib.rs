//! Daemon runtime: poll loop, metrics endpoint, graceful shutdown.

mod error;
pub mod metrics;
mod runtime;

pub use error::DaemonError;
pub use metrics::Metrics;
pub use runtime::{init_tracing, run_from_config, run_loop, RunOptions};

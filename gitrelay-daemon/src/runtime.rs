//! Poll loop driving the sync pipeline.
//!
//! One pass at a time, fully sequential; between passes the loop sleeps the
//! configured interval and honors ctrl-c. Run-once mode performs a single
//! cycle and exits with that pass's result. Metrics are recorded after every
//! pass through the handle passed in at startup.

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use gitrelay_core::{ChangeCache, Config};
use gitrelay_sync::{
    GitPublisher, ObjectStore, PassOutcome, Pipeline, Publisher, S3ObjectStore,
};

use crate::error::{io_err, DaemonError};
use crate::metrics::{self, Metrics};

/// Mode flags for a daemon invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Report would-be destinations after extraction; push and commit
    /// nothing. Always behaves as a single cycle.
    pub dry_run: bool,
    /// Perform one pass and exit with its result instead of polling.
    pub run_once: bool,
}

impl RunOptions {
    fn single_cycle(&self) -> bool {
        self.run_once || self.dry_run
    }
}

/// Wire the production store and publisher from config and run the loop.
pub async fn run_from_config(config: Config, options: RunOptions) -> Result<(), DaemonError> {
    if !config.workdir.exists() {
        fs::create_dir_all(&config.workdir).map_err(|err| io_err(&config.workdir, err))?;
    }

    let store = S3ObjectStore::connect(config.bucket.clone()).await;
    let publisher = GitPublisher::new(
        config.gitlab_base_url.clone(),
        config.gitlab_username.clone(),
        config.gitlab_token.clone(),
        config.ca_cert_path.clone(),
    );
    let pipeline = Pipeline::new(
        store,
        publisher,
        config.private_key_path.clone(),
        config.private_key_passphrase.clone(),
        config.workdir.clone(),
        config.gitlab_base_url.clone(),
    );

    let metrics = Arc::new(Metrics::new(config.shard_id.clone()));
    if !options.single_cycle() {
        let metrics = Arc::clone(&metrics);
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(err) = metrics::serve(metrics, port).await {
                tracing::error!(error = %err, "metrics endpoint failed");
            }
        });
    }

    run_loop(&pipeline, &metrics, &config, options).await
}

/// The poll loop proper, generic so tests can drive it with doubles.
pub async fn run_loop<S: ObjectStore, P: Publisher>(
    pipeline: &Pipeline<S, P>,
    metrics: &Metrics,
    config: &Config,
    options: RunOptions,
) -> Result<(), DaemonError> {
    let mut cache = ChangeCache::new();

    loop {
        tracing::info!(shard = %config.shard_id, "beginning sync pass");
        let started = Instant::now();
        let result = pipeline.run_pass(&mut cache, options.dry_run).await;
        let elapsed = started.elapsed();
        metrics.record_pass(result.is_ok(), elapsed);

        match &result {
            Ok(PassOutcome::UpToDate) => {
                tracing::info!(duration_ms = elapsed.as_millis() as u64, "nothing to sync");
            }
            Ok(PassOutcome::DryRun(planned)) => {
                tracing::info!(
                    count = planned.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "dry-run pass complete",
                );
            }
            Ok(PassOutcome::Published(planned)) => {
                for push in planned {
                    tracing::info!(
                        destination = %push.destination,
                        branch = %push.branch,
                        short_sha = %push.short_sha,
                        "pushed latest",
                    );
                }
                tracing::info!(
                    count = planned.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "sync pass completed",
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "sync pass failed");
            }
        }

        if options.single_cycle() {
            return result.map(|_| ()).map_err(DaemonError::from);
        }

        tokio::select! {
            _ = tokio::time::sleep(config.reconcile_sleep) => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    tracing::warn!(error = %err, "ctrl-c handler failed, continuing");
                    continue;
                }
                tracing::info!("received ctrl-c, shutting down");
                return Ok(());
            }
        }
    }
}

/// Install the tracing subscriber for the process. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

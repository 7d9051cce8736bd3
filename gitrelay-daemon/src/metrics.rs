//! Pass metrics and the `/metrics` exposition endpoint.
//!
//! An explicit [`Metrics`] handle is created at startup and passed into the
//! poll loop; there are no process globals. The endpoint renders Prometheus
//! text format by hand, which keeps the surface at three series:
//! a success counter, a last-status gauge, and a last-duration gauge, all
//! labelled with the shard identifier.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::error::DaemonError;

/// Process-lifetime pass metrics, tagged by shard.
#[derive(Debug)]
pub struct Metrics {
    shard: String,
    success_total: AtomicU64,
    /// 0 = last pass succeeded, 1 = last pass failed.
    last_status: AtomicU64,
    /// Duration of the last pass, stored as f64 bits.
    last_duration_bits: AtomicU64,
}

impl Metrics {
    pub fn new(shard: impl Into<String>) -> Self {
        Self {
            shard: shard.into(),
            success_total: AtomicU64::new(0),
            last_status: AtomicU64::new(0),
            last_duration_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Record the outcome of one completed pass. The success counter only
    /// increments on success; the gauges always reflect the latest pass.
    pub fn record_pass(&self, success: bool, duration: Duration) {
        self.last_status
            .store(if success { 0 } else { 1 }, Ordering::Relaxed);
        self.last_duration_bits
            .store(duration.as_secs_f64().to_bits(), Ordering::Relaxed);
        if success {
            self.success_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn success_total(&self) -> u64 {
        self.success_total.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition of the full metric set.
    pub fn render(&self) -> String {
        let shard = &self.shard;
        let status = self.last_status.load(Ordering::Relaxed);
        let duration = f64::from_bits(self.last_duration_bits.load(Ordering::Relaxed));
        let successes = self.success_total.load(Ordering::Relaxed);

        format!(
            "# HELP gitrelay_sync_success_total Number of fully successful sync passes.\n\
             # TYPE gitrelay_sync_success_total counter\n\
             gitrelay_sync_success_total{{shard=\"{shard}\"}} {successes}\n\
             # HELP gitrelay_last_sync_status Whether the last pass succeeded. 0 = success, 1 = failure.\n\
             # TYPE gitrelay_last_sync_status gauge\n\
             gitrelay_last_sync_status{{shard=\"{shard}\"}} {status}\n\
             # HELP gitrelay_last_sync_duration_seconds Duration of the last sync pass in seconds.\n\
             # TYPE gitrelay_last_sync_duration_seconds gauge\n\
             gitrelay_last_sync_duration_seconds{{shard=\"{shard}\"}} {duration}\n"
        )
    }
}

/// Build the metrics router; split out so tests can drive it without a
/// listener.
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.render()
}

/// Serve `/metrics` on the given port until the process exits.
pub async fn serve(metrics: Arc<Metrics>, port: u16) -> Result<(), DaemonError> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|err| DaemonError::Metrics(format!("bind port {port}: {err}")))?;
    tracing::info!(port, "metrics endpoint listening");
    axum::serve(listener, router(metrics))
        .await
        .map_err(|err| DaemonError::Metrics(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_all_series_with_shard_label() {
        let metrics = Metrics::new("shard-a");
        metrics.record_pass(true, Duration::from_millis(1500));

        let text = metrics.render();
        assert!(text.contains("gitrelay_sync_success_total{shard=\"shard-a\"} 1"));
        assert!(text.contains("gitrelay_last_sync_status{shard=\"shard-a\"} 0"));
        assert!(text.contains("gitrelay_last_sync_duration_seconds{shard=\"shard-a\"} 1.5"));
    }

    #[test]
    fn failed_pass_sets_status_without_incrementing_counter() {
        let metrics = Metrics::new("shard-a");
        metrics.record_pass(true, Duration::from_secs(1));
        metrics.record_pass(false, Duration::from_secs(2));

        assert_eq!(metrics.success_total(), 1);
        let text = metrics.render();
        assert!(text.contains("gitrelay_last_sync_status{shard=\"shard-a\"} 1"));
        assert!(text.contains("gitrelay_last_sync_duration_seconds{shard=\"shard-a\"} 2"));
    }
}

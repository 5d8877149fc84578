// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sentinel_runs_total", "Pipeline invocations.");
        describe_counter!("sentinel_sources_polled_total", "Sources fetched.");
        describe_counter!(
            "sentinel_fetch_errors_total",
            "Source fetches that timed out or failed."
        );
        describe_counter!(
            "sentinel_candidates_total",
            "Candidates extracted after the per-source cap."
        );
        describe_counter!("sentinel_new_items_total", "Items persisted as new.");
        describe_counter!(
            "sentinel_insert_errors_total",
            "Item inserts rejected by the store (duplicates excluded)."
        );
        describe_counter!(
            "sentinel_notify_attempts_total",
            "Calls made to the messaging transport."
        );
        describe_histogram!("sentinel_fetch_ms", "Source fetch time in milliseconds.");
        describe_gauge!("sentinel_last_run_ts", "Unix ts when a run last finished.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe();
        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format.
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

/// One-time descriptions so series show help text on /metrics.
fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_added_total", "Items inserted into the feed store.");
        describe_counter!(
            "ingest_source_errors_total",
            "Feed or section page fetch/parse failures, by source."
        );
        describe_counter!(
            "ingest_extract_failures_total",
            "Candidates skipped because full-text extraction failed."
        );
        describe_gauge!("feed_store_items", "Items currently held in the feed store.");
        describe_counter!(
            "extract_requests_total",
            "Extractor results by winning method (or failed)."
        );
        describe_counter!(
            "scheduler_task_failures_total",
            "Scheduled task runs that returned an error or panicked."
        );
        describe_counter!("purge_rows_deleted_total", "Rows deleted by the purge job.");
    });
}

// src/metrics.rs
use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// Register help text for every metric the crate emits. Safe to call repeatedly.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_items_fetched_total", "Raw items returned by sources.");
        describe_counter!(
            "pipeline_source_errors_total",
            "Source fetches that failed or timed out and yielded an empty batch."
        );
        describe_counter!("pipeline_candidates_total", "Candidates produced by the extractor.");
        describe_counter!(
            "pipeline_announcements_new_total",
            "Announcements created by the deduplicator."
        );
        describe_counter!(
            "pipeline_announcements_merged_total",
            "Candidates merged into an existing announcement."
        );
        describe_counter!("drafting_posts_total", "Post drafts produced, labeled by generator kind.");
        describe_counter!(
            "drafting_fallback_total",
            "AI drafts that failed and fell back to the next strategy."
        );
        describe_counter!(
            "workflow_transitions_total",
            "Workflow transitions, labeled by event and target status."
        );
        describe_histogram!("pipeline_fetch_ms", "Per-source fetch time in milliseconds.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix timestamp (seconds) of the last completed pipeline run."
        );
    });
}

/// Install the Prometheus recorder with an HTTP listener on `addr` (`/metrics`).
/// Must run inside a tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("installing prometheus exporter on {addr}"))?;
    ensure_metrics_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_is_idempotent_without_recorder() {
        ensure_metrics_described();
        ensure_metrics_described();
    }
}

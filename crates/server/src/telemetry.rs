//! Prometheus wiring for the search service.

use std::time::Duration;

use matcher::{SearchMetrics, SearchOutcome};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use semantic::ModelStatus;

use crate::error::{ServerError, ServerResult};

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the process-wide Prometheus recorder, or return the one already
/// installed.
pub fn install_recorder() -> ServerResult<PrometheusHandle> {
    PROMETHEUS
        .get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| ServerError::Config(format!("metrics recorder: {e}")))?;
            describe();
            Ok(handle)
        })
        .cloned()
}

fn describe() {
    metrics::describe_counter!(
        "semsearch_search_requests_total",
        "Search requests by outcome"
    );
    metrics::describe_histogram!(
        "semsearch_search_duration_seconds",
        metrics::Unit::Seconds,
        "End-to-end search latency"
    );
    metrics::describe_histogram!("semsearch_search_hits", "Results returned per successful search");
    metrics::describe_counter!(
        "semsearch_documents_indexed_total",
        "Document writes by outcome"
    );
    metrics::describe_gauge!("semsearch_model_ready", "1 when the embedding model is ready");
    metrics::describe_counter!("semsearch_http_requests_total", "HTTP requests by status");
}

/// [`SearchMetrics`] backed by the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusSearchMetrics;

impl SearchMetrics for PrometheusSearchMetrics {
    fn record_search(&self, latency: Duration, hit_count: usize, outcome: SearchOutcome) {
        counter!("semsearch_search_requests_total", "outcome" => outcome.as_str()).increment(1);
        histogram!("semsearch_search_duration_seconds", "outcome" => outcome.as_str())
            .record(latency.as_secs_f64());
        if outcome == SearchOutcome::Ok {
            histogram!("semsearch_search_hits").record(hit_count as f64);
        }
    }

    fn record_index(&self, latency: Duration, outcome: SearchOutcome) {
        counter!("semsearch_documents_indexed_total", "outcome" => outcome.as_str()).increment(1);
        histogram!("semsearch_index_duration_seconds").record(latency.as_secs_f64());
    }
}

/// Mirror the lifecycle snapshot into gauges.
pub fn record_model_status(status: &ModelStatus) {
    gauge!("semsearch_model_ready").set(if status.is_ready { 1.0 } else { 0.0 });
    gauge!("semsearch_model_retry_count").set(status.retry_count as f64);
}

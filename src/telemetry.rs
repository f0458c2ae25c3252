//! Metrics recording and the Prometheus exporter.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`MetricsService::install`] registers the Prometheus recorder.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::error::{Error, Result};

/// Search requests, labelled by outcome.
pub const SEARCH_REQUESTS_TOTAL: &str = "search_requests_total";
/// Texts sent through the encoder.
pub const QUERY_ENCODINGS_TOTAL: &str = "query_encodings_total";
/// Encoder latency.
pub const QUERY_ENCODING_SECONDS: &str = "query_encoding_seconds";
/// Vector store round-trip latency, labelled by HTTP status.
pub const VECTOR_STORE_QUERY_SECONDS: &str = "vector_store_query_seconds";

/// Count a finished search request.
pub fn record_search(outcome: &'static str) {
    ::metrics::counter!(SEARCH_REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record one encoder invocation.
pub fn record_encoding(elapsed: Duration) {
    ::metrics::counter!(QUERY_ENCODINGS_TOTAL).increment(1);
    ::metrics::histogram!(QUERY_ENCODING_SECONDS).record(elapsed.as_secs_f64());
}

/// Record one vector store round trip.
pub fn record_vector_store_query(elapsed: Duration, status: u16) {
    ::metrics::histogram!(VECTOR_STORE_QUERY_SECONDS, "status" => status.to_string())
        .record(elapsed.as_secs_f64());
}

/// Handle to the process-wide Prometheus recorder.
#[derive(Clone)]
pub struct MetricsService {
    handle: PrometheusHandle,
}

impl MetricsService {
    /// Install the Prometheus recorder as the global `metrics` recorder.
    ///
    /// Can only succeed once per process.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {}", e)))?;
        Ok(Self { handle })
    }

    /// Render the current metrics in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

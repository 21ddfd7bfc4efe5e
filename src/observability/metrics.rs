//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): handled calls by response status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_rejections_total` (counter): terminal errors by kind
//! - `proxy_upstream_duration_seconds` (histogram): upstream round trip by status
//! - `proxy_token_acquisitions_total` (counter): token endpoint outcomes
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Labels stay low-cardinality: status codes and fixed kind strings only

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one handled proxy call.
pub fn record_request(status: u16, start: Instant) {
    counter!("proxy_requests_total", "status" => status.to_string()).increment(1);
    histogram!("proxy_request_duration_seconds", "status" => status.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a call that ended in a proxy-generated error.
pub fn record_rejection(kind: &'static str) {
    counter!("proxy_rejections_total", "kind" => kind).increment(1);
}

/// Record one upstream round trip.
pub fn record_upstream_duration(status: u16, start: Instant) {
    histogram!("proxy_upstream_duration_seconds", "status" => status.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of a token endpoint call.
pub fn record_token_acquisition(outcome: &'static str) {
    counter!("proxy_token_acquisitions_total", "outcome" => outcome).increment(1);
}

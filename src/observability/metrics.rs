//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relayed requests by client status
//! - `relay_request_duration_seconds` (histogram): end-to-end latency
//! - `relay_upstream_attempts_total` (counter): upstream attempts by outcome
//! - `relay_upstream_retries_total` (counter): retries scheduled
//! - `relay_handler_panics_total` (counter): panics caught at the top level
//!
//! Recording without an installed recorder is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    metrics::counter!("relay_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_attempt(outcome: &'static str) {
    metrics::counter!("relay_upstream_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_retry() {
    metrics::counter!("relay_upstream_retries_total").increment(1);
}

pub fn record_panic() {
    metrics::counter!("relay_handler_panics_total").increment(1);
}

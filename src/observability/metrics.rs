//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gray_requests_total` (counter): forwarded and locally answered requests by method, status
//! - `gray_request_duration_seconds` (histogram): request latency
//! - `gray_decisions_total` (counter): cohort decisions by outcome
//! - `gray_admission_total` (counter): admitted vs throttled
//! - `gray_store_events_total` (counter): correlation store writes, conflicts, failures

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gray_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gray_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_decision(decision: &'static str) {
    metrics::counter!("gray_decisions_total", "decision" => decision).increment(1);
}

pub fn record_admission(outcome: &'static str) {
    metrics::counter!("gray_admission_total", "outcome" => outcome).increment(1);
}

pub fn record_store_event(event: &'static str) {
    metrics::counter!("gray_store_events_total", "event" => event).increment(1);
}

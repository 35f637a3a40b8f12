//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ipquery_requests_total` (counter): HTTP requests by route, status
//! - `ipquery_resolutions_total` (counter): resolved client addresses by source
//! - `ipquery_untrusted_forwarding_total` (counter): forwarding headers ignored
//! - `ipquery_enrichment_duration_seconds` (histogram): per-enricher latency
//! - `ipquery_enrichment_failures_total` (counter): by enricher, criticality
//!
//! Without an installed recorder every call here is a no-op, so library
//! users and tests pay nothing.

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

pub fn record_request(route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "ipquery_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("ipquery_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_resolution(source: &'static str) {
    metrics::counter!("ipquery_resolutions_total", "source" => source).increment(1);
}

pub fn record_untrusted_forwarding() {
    metrics::counter!("ipquery_untrusted_forwarding_total").increment(1);
}

pub fn record_enrichment(stage: &'static str, start: Instant) {
    metrics::histogram!("ipquery_enrichment_duration_seconds", "stage" => stage)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_enrichment_failure(stage: &'static str, criticality: &'static str) {
    metrics::counter!(
        "ipquery_enrichment_failures_total",
        "stage" => stage,
        "criticality" => criticality
    )
    .increment(1);
}

pub fn record_database_reload(database: &'static str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!(
        "ipquery_database_reloads_total",
        "database" => database,
        "outcome" => outcome
    )
    .increment(1);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, kind, status
//! - `gateway_request_duration_seconds` (histogram): latency by route, kind
//! - `gateway_backend_dials_total` (counter): backend dials by outcome
//! - `gateway_destination_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Prometheus exporter runs its own HTTP listener, separate from the gateway port
//! - Labels for route, backend, status code

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(route: &str, kind: &str, status: u16, start: Instant) {
    let labels = [
        ("route", route.to_string()),
        ("kind", kind.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("gateway_requests_total", &labels).increment(1);
    ::metrics::histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string(),
        "kind" => kind.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_dial(backend: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    ::metrics::counter!(
        "gateway_backend_dials_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_destination_health(cluster: &str, destination: &str, healthy: bool) {
    ::metrics::gauge!(
        "gateway_destination_health",
        "cluster" => cluster.to_string(),
        "destination" => destination.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (RPS, latency, mounted routes, remounts)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `waypoint_requests_total` (counter): total requests by method, route, status
//! - `waypoint_request_duration_seconds` (histogram): latency distribution
//! - `waypoint_routes_mounted` (gauge): endpoints in the active table
//! - `waypoint_remounts_total` (counter): successful remounts
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels use the route pattern, never the raw path
//! - Recording without an installed exporter is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Route label for requests that matched nothing.
pub const UNMATCHED: &str = "none";

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("waypoint_requests_total", &labels).increment(1);
    metrics::histogram!("waypoint_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn set_routes_mounted(count: usize) {
    metrics::gauge!("waypoint_routes_mounted").set(count as f64);
}

pub fn record_remount() {
    metrics::counter!("waypoint_remounts_total").increment(1);
}

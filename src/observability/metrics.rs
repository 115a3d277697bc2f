//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, method, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_auth_failures_total` (counter): rejected tokens by reason
//! - `gateway_route_table_reloads_total` (counter): reloads by outcome
//! - `gateway_routes` (gauge): routes in the active table
//!
//! Without an installed recorder every call here is a no-op.
//!
//! Label values come from fixed sets; extension methods are counted as
//! `other` so clients cannot mint new series.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

const STANDARD_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "CONNECT", "TRACE",
];

/// Label for `method`: the standard verbs by name, anything else `other`.
pub fn method_label(method: &Method) -> &'static str {
    STANDARD_METHODS
        .iter()
        .copied()
        .find(|m| *m == method.as_str())
        .unwrap_or("other")
}

pub fn record_request(route: &str, method: &Method, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_owned(),
        "method" => method_label(method),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_owned())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_failure(reason: &'static str) {
    counter!("gateway_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_reload(outcome: &'static str) {
    counter!("gateway_route_table_reloads_total", "outcome" => outcome).increment(1);
}

pub fn set_route_count(count: usize) {
    gauge!("gateway_routes").set(count as f64);
}

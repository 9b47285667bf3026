//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by domain and status
//! - `proxy_request_duration_seconds` (histogram): latency by domain
//!
//! Unmatched requests are recorded under the domain `none` so client-chosen
//! hosts cannot inflate label cardinality.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Label used for requests that matched no route.
pub const UNMATCHED: &str = "none";

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(domain: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "domain" => domain.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "proxy_request_duration_seconds",
        "domain" => domain.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): by status and outcome
//! - `proxy_request_duration_seconds` (histogram): accept to response headers
//! - `proxy_relay_aborts_total` (counter): upstream bodies failing mid-relay
//! - `proxy_active_relays` (gauge): requests not yet fully relayed
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request (headers written).
pub fn record_request(status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record an upstream body failure after headers were sent.
pub fn record_relay_abort() {
    metrics::counter!("proxy_relay_aborts_total").increment(1);
}

/// A relay was accepted.
pub fn relay_started() {
    metrics::gauge!("proxy_active_relays").increment(1.0);
}

/// A relay ended, however it ended.
pub fn relay_finished() {
    metrics::gauge!("proxy_active_relays").decrement(1.0);
}

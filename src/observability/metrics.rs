//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ingest_connections_accepted_total` (counter)
//! - `ingest_connections_closed_total` (counter): by `outcome`
//! - `ingest_bytes_received_total` (counter)
//! - `ingest_accept_errors_total` (counter)
//! - `ingest_active_connections` (gauge)
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_accepted(active: u64) {
    counter!("ingest_connections_accepted_total").increment(1);
    gauge!("ingest_active_connections").set(active as f64);
}

pub fn record_connection_closed(outcome: &'static str, active: u64) {
    counter!("ingest_connections_closed_total", "outcome" => outcome).increment(1);
    gauge!("ingest_active_connections").set(active as f64);
}

pub fn record_bytes_received(bytes: usize) {
    counter!("ingest_bytes_received_total").increment(bytes as u64);
}

pub fn record_accept_error() {
    counter!("ingest_accept_errors_total").increment(1);
}

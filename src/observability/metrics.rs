//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tunnel_sessions_total` (counter): sessions admitted
//! - `tunnel_sessions_active` (gauge): live sessions
//! - `tunnel_sessions_refused_total` (counter): upgrades refused at the session limit
//! - `tunnel_handshake_rejected_total` (counter): headers refused, by reason
//! - `tunnel_upstream_connect_failures_total` (counter): failed outbound dials
//! - `tunnel_relay_bytes_total` (counter): relayed bytes, by direction
//! - `tunnel_session_duration_seconds` (histogram): session lifetime, by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter is optional and owns its own listener

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_opened() {
    ::metrics::counter!("tunnel_sessions_total").increment(1);
}

pub fn record_session_refused() {
    ::metrics::counter!("tunnel_sessions_refused_total").increment(1);
}

pub fn set_active_sessions(count: u64) {
    ::metrics::gauge!("tunnel_sessions_active").set(count as f64);
}

pub fn record_handshake_rejected(reason: &'static str) {
    ::metrics::counter!("tunnel_handshake_rejected_total", "reason" => reason).increment(1);
}

pub fn record_upstream_connect_failure() {
    ::metrics::counter!("tunnel_upstream_connect_failures_total").increment(1);
}

pub fn record_relay_bytes(direction: &'static str, bytes: u64) {
    ::metrics::counter!("tunnel_relay_bytes_total", "direction" => direction).increment(bytes);
}

pub fn record_session_closed(outcome: &'static str, lifetime: Duration) {
    ::metrics::histogram!("tunnel_session_duration_seconds", "outcome" => outcome)
        .record(lifetime.as_secs_f64());
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the tunnel relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TunnelConfig {
    /// Listener configuration (bind address, admission limit).
    pub listener: ListenerConfig,

    /// Tunneling protocol settings (shared secret, endpoint path, bounds).
    pub tunnel: TunnelSection,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum concurrent sessions (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Tunneling protocol configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TunnelSection {
    /// Shared secret in canonical UUID text form.
    /// Empty means "generate a random one at startup".
    pub uuid: String,

    /// WebSocket endpoint path clients must upgrade on.
    pub ws_path: String,

    /// Upper bound on bytes buffered while the request header is incomplete.
    pub max_header_bytes: usize,

    /// Largest single inbound WebSocket message accepted.
    pub max_message_bytes: usize,
}

impl Default for TunnelSection {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            ws_path: "/ws".to_string(),
            max_header_bytes: 1024,
            max_message_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration. A value of zero disables the timeout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outbound connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Relay idle timeout in seconds (no bytes in either direction).
    pub idle_secs: u64,

    /// How long shutdown waits for live sessions to drain, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            idle_secs: 0,
            shutdown_grace_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty", "compact" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: TunnelConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.tunnel.ws_path, "/ws");
        assert_eq!(config.tunnel.max_header_bytes, 1024);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.timeouts.idle_secs, 0);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: TunnelConfig = toml::from_str(
            r#"
            [tunnel]
            uuid = "d342d11e-d424-4583-b36e-524ab1f0afa4"

            [timeouts]
            idle_secs = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.tunnel.uuid, "d342d11e-d424-4583-b36e-524ab1f0afa4");
        assert_eq!(config.tunnel.ws_path, "/ws");
        assert_eq!(config.timeouts.idle_secs, 300);
        assert_eq!(config.timeouts.connect_secs, 5);
    }
}

//! Runtime settings derived from a validated configuration.

use std::time::Duration;

use crate::config::schema::TunnelConfig;
use crate::protocol::Secret;

/// Immutable per-process tunnel settings handed to every session.
#[derive(Debug, Clone)]
pub struct TunnelSettings {
    /// Expected client id.
    pub secret: Secret,
    /// Normalised WebSocket endpoint path.
    pub ws_path: String,
    /// Bytes a session may buffer before its header is complete.
    pub max_header_bytes: usize,
    /// Largest inbound transport message.
    pub max_message_bytes: usize,
    /// Outbound connect bound, `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// Relay idle bound, `None` relays until a side closes.
    pub idle_timeout: Option<Duration>,
}

impl TunnelSettings {
    /// Default settings around the given secret.
    pub fn with_secret(secret: Secret) -> Self {
        let config = TunnelConfig::default();
        Self {
            secret,
            ws_path: normalize_ws_path(&config.tunnel.ws_path),
            max_header_bytes: config.tunnel.max_header_bytes,
            max_message_bytes: config.tunnel.max_message_bytes,
            connect_timeout: secs(config.timeouts.connect_secs),
            idle_timeout: secs(config.timeouts.idle_secs),
        }
    }

    /// Build settings from a validated config.
    pub fn from_config(config: &TunnelConfig) -> Result<Self, uuid::Error> {
        let secret = config.tunnel.uuid.parse::<Secret>()?;
        Ok(Self {
            secret,
            ws_path: normalize_ws_path(&config.tunnel.ws_path),
            max_header_bytes: config.tunnel.max_header_bytes,
            max_message_bytes: config.tunnel.max_message_bytes,
            connect_timeout: secs(config.timeouts.connect_secs),
            idle_timeout: secs(config.timeouts.idle_secs),
        })
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

/// Ensure a leading `/` and drop a single trailing `/` (except for the root).
pub fn normalize_ws_path(path: &str) -> String {
    let path = path.trim();
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

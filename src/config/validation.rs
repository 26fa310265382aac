//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, the shared secret and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TunnelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::TunnelConfig;
use crate::config::settings::normalize_ws_path;
use crate::protocol::{Secret, MAX_HEADER_LEN};

/// Largest configurable header buffering bound.
pub const MAX_HEADER_BOUND: usize = 64 * 1024;

const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("tunnel.uuid {0:?} is not a valid UUID")]
    Uuid(String),

    #[error("tunnel.ws_path {0:?} may not contain route wildcards")]
    WsPath(String),

    #[error("tunnel.max_header_bytes {0} must be between {min} and {max}", min = MAX_HEADER_LEN, max = MAX_HEADER_BOUND)]
    HeaderBound(usize),

    #[error("tunnel.max_message_bytes {message} is smaller than tunnel.max_header_bytes {header}")]
    MessageBound { message: usize, header: usize },

    #[error("observability.log_format {0:?} is not one of pretty, compact, json")]
    LogFormat(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &TunnelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    let tunnel = &config.tunnel;
    // An empty uuid is filled in with a random one at startup.
    if !tunnel.uuid.trim().is_empty() && tunnel.uuid.parse::<Secret>().is_err() {
        errors.push(ValidationError::Uuid(tunnel.uuid.clone()));
    }
    let path = normalize_ws_path(&tunnel.ws_path);
    if path.contains(['{', '}', '*']) || path.contains("/:") {
        errors.push(ValidationError::WsPath(tunnel.ws_path.clone()));
    }
    // Must hold the longest legal header.
    if !(MAX_HEADER_LEN..=MAX_HEADER_BOUND).contains(&tunnel.max_header_bytes) {
        errors.push(ValidationError::HeaderBound(tunnel.max_header_bytes));
    }
    if tunnel.max_message_bytes < tunnel.max_header_bytes {
        errors.push(ValidationError::MessageBound {
            message: tunnel.max_message_bytes,
            header: tunnel.max_header_bytes,
        });
    }

    let observability = &config.observability;
    if !LOG_FORMATS.contains(&observability.log_format.as_str()) {
        errors.push(ValidationError::LogFormat(observability.log_format.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

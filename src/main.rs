//! WebSocket tunneling relay (v1)
//!
//! Accepts WebSocket connections, authenticates a binary request header
//! against a shared secret, dials the requested TCP destination and relays
//! bytes both ways until either side closes.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                  TUNNEL RELAY                    │
//!                   │                                                  │
//!   WebSocket       │  ┌─────────┐   ┌───────────┐   ┌────────────┐    │
//!   ────────────────┼─▶│  http   │──▶│  tunnel   │──▶│ connector  │────┼──▶ TCP
//!                   │  │ server  │   │  session  │   │            │    │   destination
//!                   │  └─────────┘   └─────┬─────┘   └────────────┘    │
//!                   │                      │ header                    │
//!                   │                      ▼                           │
//!                   │                ┌───────────┐                     │
//!                   │                │ protocol  │                     │
//!                   │                └───────────┘                     │
//!                   │                                                  │
//!                   │  config · net (admission) · observability ·      │
//!                   │  lifecycle (signals, drain)                      │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use tunnel_relay::config::{self, TunnelSettings};
use tunnel_relay::http::HttpServer;
use tunnel_relay::lifecycle::{wait_for_signal, Shutdown};
use tunnel_relay::net::SessionTracker;
use tunnel_relay::observability::{logging, metrics};
use tunnel_relay::protocol::Secret;

#[derive(Parser)]
#[command(name = "tunnel-relay", version, about = "WebSocket tunneling relay")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "TUNNEL_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    logging::init(&config.observability);

    tracing::info!("tunnel-relay v{} starting", env!("CARGO_PKG_VERSION"));

    if config.tunnel.uuid.trim().is_empty() {
        let secret = Secret::random();
        config.tunnel.uuid = secret.to_uuid().to_string();
        tracing::warn!(
            uuid = %config.tunnel.uuid,
            "No uuid configured, generated a random one for this run"
        );
    }

    let settings = Arc::new(TunnelSettings::from_config(&config)?);
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        ws_path = %settings.ws_path,
        connect_timeout = ?settings.connect_timeout,
        idle_timeout = ?settings.idle_timeout,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let tracker = SessionTracker::new(config.listener.max_connections);
    let shutdown = Shutdown::new();
    let server = HttpServer::new(Arc::clone(&settings), tracker.clone());
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                tracing::info!(signal = %signal, "Shutdown signal received");
                signal_shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
    });

    server.run(listener, server_shutdown).await?;

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let active = tracker.active_count();
    if active > 0 {
        tracing::info!(active_sessions = active, grace = ?grace, "Draining sessions");
        if !tracker.drain(grace).await {
            tracing::warn!(
                active_sessions = tracker.active_count(),
                "Grace period elapsed, abandoning remaining sessions"
            );
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the single tunnel endpoint
//! - Enforce session admission before upgrading
//! - Hand each upgraded socket to a tunnel session
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::TunnelSettings;
use crate::http::websocket::websocket_channel;
use crate::net::SessionTracker;
use crate::tunnel::{Connector, SessionFactory, TcpConnector};

/// HTTP server for the tunnel relay.
pub struct HttpServer {
    router: Router,
    ws_path: String,
}

impl HttpServer {
    /// Create a server that dials destinations over plain TCP.
    pub fn new(settings: Arc<TunnelSettings>, tracker: SessionTracker) -> Self {
        Self::with_connector(settings, TcpConnector, tracker)
    }

    /// Create a server with a custom outbound connector.
    pub fn with_connector<C: Connector>(
        settings: Arc<TunnelSettings>,
        connector: C,
        tracker: SessionTracker,
    ) -> Self {
        let ws_path = settings.ws_path.clone();
        let factory = SessionFactory::new(settings, connector, tracker);
        let router = Self::build_router(&ws_path, factory);
        Self { router, ws_path }
    }

    fn build_router<C: Connector>(ws_path: &str, factory: SessionFactory<C>) -> Router {
        Router::new()
            .route(ws_path, any(tunnel_handler::<C>))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .with_state(factory)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Returns once the listener is closed; upgraded sessions keep running
    /// and are drained by the caller.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            ws_path = %self.ws_path,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server no longer accepting connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Admit the session, then upgrade and run it on the socket.
async fn tunnel_handler<C: Connector>(
    State(factory): State<SessionFactory<C>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(session) = factory.open() else {
        tracing::warn!(
            peer = %peer,
            max_sessions = factory.tracker().max_sessions(),
            "Session limit reached, refusing upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many sessions").into_response();
    };

    let span = tracing::info_span!("session", connection_id = %session.id(), peer = %peer);
    let max_message = factory.settings().max_message_bytes;

    ws.max_message_size(max_message)
        .max_frame_size(max_message)
        .on_failed_upgrade(|e| tracing::debug!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| {
            async move {
                tracing::debug!("Session started");
                let (sink, stream) = websocket_channel(socket);
                let _ = session.run(sink, stream).await;
            }
            .instrument(span)
        })
}

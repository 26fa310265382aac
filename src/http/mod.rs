//! HTTP and WebSocket front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, path match, admission)
//!     → WebSocket upgrade
//!     → websocket.rs (messages ↔ byte chunks)
//!     → tunnel::Session
//! ```

pub mod server;
pub mod websocket;

pub use server::HttpServer;
pub use websocket::websocket_channel;

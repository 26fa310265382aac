//! WebSocket tunneling relay library

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod tunnel;

pub use config::{TunnelConfig, TunnelSettings};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use protocol::Secret;

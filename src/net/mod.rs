//! Network accounting subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket upgrade request
//!     → connection.rs (admission against max_connections)
//!     → SessionGuard held for the session's lifetime
//!     → dropped on close, slot released
//! ```
//!
//! # Design Decisions
//! - Admission is refused (HTTP 503) instead of queued when full
//! - Every session carries a ConnectionId for log correlation

pub mod connection;

pub use connection::{ConnectionId, SessionGuard, SessionTracker};

//! Tunnel sessions: header handshake, outbound connect, and relaying.
//!
//! # Data Flow
//! ```text
//! client ──chunks──▶ Session (Buffering) ──header──▶ Connector
//!                        │                              │
//!                        ◀───────────ack────────────────┘
//!                        ▼
//!                   RelayEngine ◀──────bytes──────▶ destination
//! ```
//!
//! The client carrier is abstracted as [`ClientStream`]/[`ClientSink`] so the
//! session logic does not depend on WebSocket framing.

pub mod channel;
pub mod connector;
pub mod relay;
pub mod session;

pub use channel::{ChannelError, ClientSink, ClientStream};
pub use connector::{Connector, TcpConnector};
pub use relay::{RelayEnd, RelayEngine, RelayReport, RELAY_BUFFER_SIZE};
pub use session::{Session, SessionError, SessionFactory, SessionState};

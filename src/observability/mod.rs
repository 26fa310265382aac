//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions and the HTTP layer produce:
//!     → logging.rs (structured log events, connection_id on every session span)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Handshake rejections are visible here and nowhere else; clients only
//!   ever see a closed transport

pub mod logging;
pub mod metrics;

//! Tunneling protocol wire format.
//!
//! # Request Header
//! ```text
//! +---------+----------+-----------+--------+---------+------+-----------+---------+
//! | version | id       | addon len | addons | command | port | addr type | address |
//! | 1 byte  | 16 bytes | 1 byte    | N      | 1 byte  | 2 BE | 1 byte    | var     |
//! +---------+----------+-----------+--------+---------+------+-----------+---------+
//! ```
//! Address is 4 raw bytes (type 1), a length-prefixed domain (type 2) or
//! 16 raw bytes (type 3). Everything after the address is payload.
//!
//! # Response
//! Exactly two zero bytes, sent once the outbound connection is up.

pub mod address;
pub mod header;
pub mod secret;

pub use address::TargetAddr;
pub use header::{encode_header, parse_header, EncodeError, ParseOutcome, ParsedHeader, RejectReason};
pub use secret::Secret;

/// The only accepted protocol version.
pub const VERSION: u8 = 0;

/// TCP connect, the only supported command.
pub const COMMAND_TCP: u8 = 1;

pub const ADDR_IPV4: u8 = 1;
pub const ADDR_DOMAIN: u8 = 2;
pub const ADDR_IPV6: u8 = 3;

/// Acknowledgement written to the client once the destination is reachable.
pub const RESPONSE_ACK: [u8; 2] = [0x00, 0x00];

/// Length of the identifier field.
pub const ID_LEN: usize = 16;

/// Smallest possible header: no addons, IPv4 destination.
pub const MIN_HEADER_LEN: usize = 1 + ID_LEN + 1 + 1 + 2 + 1 + 4;

/// Largest possible header: 255 bytes of addons and a 255-byte domain.
pub const MAX_HEADER_LEN: usize = 1 + ID_LEN + 1 + 255 + 1 + 2 + 1 + 1 + 255;

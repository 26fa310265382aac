//! Request header decoding.
//!
//! # Responsibilities
//! - Classify an accumulated byte buffer as incomplete, invalid or parsed
//! - Slice off the payload that trails the header without copying
//! - Encode headers for clients and tests
//!
//! # Design Decisions
//! - Pure function over `&[u8]`; the caller owns buffering
//! - Each field is validated as soon as its bytes are present, so a bad
//!   version or id is rejected without waiting for the rest of the header
//! - The result does not depend on how the bytes were chunked in transit

use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;

use super::{
    Secret, TargetAddr, ADDR_DOMAIN, ADDR_IPV4, ADDR_IPV6, COMMAND_TCP, ID_LEN, VERSION,
};

/// Why a header was refused. Never sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("client id does not match the configured secret")]
    SecretMismatch,

    #[error("unsupported command {0}")]
    UnsupportedCommand(u8),

    #[error("unsupported address type {0}")]
    UnsupportedAddressType(u8),

    #[error("empty domain name")]
    EmptyDomain,

    #[error("domain name is not valid UTF-8")]
    InvalidDomain,

    #[error("header not complete within {limit} bytes")]
    BufferLimitExceeded { limit: usize },
}

impl RejectReason {
    /// Short, stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::UnsupportedVersion(_) => "version",
            RejectReason::SecretMismatch => "secret",
            RejectReason::UnsupportedCommand(_) => "command",
            RejectReason::UnsupportedAddressType(_) => "address_type",
            RejectReason::EmptyDomain | RejectReason::InvalidDomain => "domain",
            RejectReason::BufferLimitExceeded { .. } => "oversized",
        }
    }
}

/// Destination requested by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    pub target: TargetAddr,
    pub port: u16,
}

impl ParsedHeader {
    /// Host as it is dialed and logged.
    pub fn target_host(&self) -> String {
        self.target.to_string()
    }
}

/// Result of [`parse_header`].
#[derive(Debug, PartialEq, Eq)]
pub enum ParseOutcome<'a> {
    /// More bytes are needed.
    Incomplete,
    /// The buffer can never become a valid header.
    Invalid(RejectReason),
    /// The header was decoded; `remainder` is everything after it.
    Parsed {
        header: ParsedHeader,
        remainder: &'a [u8],
    },
}

enum Halt {
    Incomplete,
    Reject(RejectReason),
}

impl From<RejectReason> for Halt {
    fn from(reason: RejectReason) -> Self {
        Halt::Reject(reason)
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], Halt> {
        let end = self.pos + n;
        let slice = self.buf.get(self.pos..end).ok_or(Halt::Incomplete)?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, Halt> {
        Ok(self.take(1)?[0])
    }

    fn u16_be(&mut self) -> Result<u16, Halt> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}

/// Decode a request header from the bytes received so far.
///
/// `buf` must hold everything the client has sent, starting at its first
/// byte. The input is never modified.
pub fn parse_header<'a>(buf: &'a [u8], secret: &Secret) -> ParseOutcome<'a> {
    match decode(buf, secret) {
        Ok((header, consumed)) => ParseOutcome::Parsed {
            header,
            remainder: &buf[consumed..],
        },
        Err(Halt::Incomplete) => ParseOutcome::Incomplete,
        Err(Halt::Reject(reason)) => ParseOutcome::Invalid(reason),
    }
}

fn decode(buf: &[u8], secret: &Secret) -> Result<(ParsedHeader, usize), Halt> {
    let mut r = Reader { buf, pos: 0 };

    let version = r.u8()?;
    if version != VERSION {
        return Err(RejectReason::UnsupportedVersion(version).into());
    }

    if !secret.matches(r.take(ID_LEN)?) {
        return Err(RejectReason::SecretMismatch.into());
    }

    let addons_len = r.u8()? as usize;
    r.take(addons_len)?;

    let command = r.u8()?;
    if command != COMMAND_TCP {
        return Err(RejectReason::UnsupportedCommand(command).into());
    }

    let port = r.u16_be()?;

    let target = match r.u8()? {
        ADDR_IPV4 => {
            let b = r.take(4)?;
            TargetAddr::Ipv4(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
        }
        ADDR_DOMAIN => {
            let len = r.u8()? as usize;
            if len == 0 {
                return Err(RejectReason::EmptyDomain.into());
            }
            let raw = r.take(len)?;
            let host = std::str::from_utf8(raw).map_err(|_| RejectReason::InvalidDomain)?;
            TargetAddr::Domain(host.to_owned())
        }
        ADDR_IPV6 => {
            let b = r.take(16)?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(b);
            TargetAddr::Ipv6(Ipv6Addr::from(octets))
        }
        other => return Err(RejectReason::UnsupportedAddressType(other).into()),
    };

    Ok((ParsedHeader { target, port }, r.pos))
}

/// Error building a header whose variable-length fields do not fit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{field} is {len} bytes, at most 255 allowed")]
    FieldTooLong { field: &'static str, len: usize },
}

/// Encode a request header, the client side of [`parse_header`].
pub fn encode_header(
    secret: &Secret,
    command: u8,
    target: &TargetAddr,
    port: u16,
    addons: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let addons_len = u8::try_from(addons.len()).map_err(|_| EncodeError::FieldTooLong {
        field: "addons",
        len: addons.len(),
    })?;

    let mut out = Vec::with_capacity(super::MIN_HEADER_LEN + addons.len() + 16);
    out.push(VERSION);
    out.extend_from_slice(secret.as_bytes());
    out.push(addons_len);
    out.extend_from_slice(addons);
    out.push(command);
    out.extend_from_slice(&port.to_be_bytes());
    out.push(target.type_code());

    match target {
        TargetAddr::Ipv4(ip) => out.extend_from_slice(&ip.octets()),
        TargetAddr::Domain(host) => {
            let len = u8::try_from(host.len()).map_err(|_| EncodeError::FieldTooLong {
                field: "domain",
                len: host.len(),
            })?;
            out.push(len);
            out.extend_from_slice(host.as_bytes());
        }
        TargetAddr::Ipv6(ip) => out.extend_from_slice(&ip.octets()),
    }

    Ok(out)
}

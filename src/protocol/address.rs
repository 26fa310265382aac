//! Destination addresses carried in the request header.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Where the client wants its bytes delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetAddr {
    Ipv4(Ipv4Addr),
    Domain(String),
    Ipv6(Ipv6Addr),
}

impl TargetAddr {
    /// Wire code for this address type.
    pub fn type_code(&self) -> u8 {
        match self {
            TargetAddr::Ipv4(_) => super::ADDR_IPV4,
            TargetAddr::Domain(_) => super::ADDR_DOMAIN,
            TargetAddr::Ipv6(_) => super::ADDR_IPV6,
        }
    }
}

/// Renders the host the way it is dialed and logged: dotted decimal for
/// IPv4, the domain verbatim, and eight uncompressed lowercase hex groups
/// for IPv6.
impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ipv4(ip) => write!(f, "{}", ip),
            TargetAddr::Domain(host) => f.write_str(host),
            TargetAddr::Ipv6(ip) => {
                for (i, group) in ip.segments().iter().enumerate() {
                    if i > 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{:x}", group)?;
                }
                Ok(())
            }
        }
    }
}

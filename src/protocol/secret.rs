//! Shared secret carried in the request header's id field.

use std::fmt;
use std::str::FromStr;

use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::ID_LEN;

/// The 16-byte identifier every client must present.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; ID_LEN]);

impl Secret {
    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(*uuid.as_bytes())
    }

    /// Generate a fresh random secret (UUID v4).
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }

    /// Constant-time comparison against an id taken off the wire.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        candidate.len() == ID_LEN && bool::from(self.0.ct_eq(candidate))
    }
}

impl FromStr for Secret {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self::from_uuid)
    }
}

// Keep the secret out of logs.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

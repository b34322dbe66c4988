use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Literal prefix carried by every request identifier.
pub const REQUEST_ID_PREFIX: &str = "req_";

/// Globally unique identifier minted for each accepted request.
///
/// Rendered as `req_` followed by a hyphenated UUID v4. The random part
/// carries 122 bits of entropy, so collisions are negligible for the
/// lifetime of the system.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Mint a fresh identifier.
    pub fn mint() -> Self {
        Self::from_uuid(uuid::Uuid::new_v4())
    }

    /// Build an identifier around an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(format!("{REQUEST_ID_PREFIX}{}", uuid.hyphenated()))
    }

    /// Parse a `req_<uuid>` string.
    ///
    /// Only the exact minted spelling is accepted: lowercase, hyphenated.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidRequestId(s.to_string());
        let raw = s.strip_prefix(REQUEST_ID_PREFIX).ok_or_else(invalid)?;
        let uuid = uuid::Uuid::parse_str(raw).map_err(|_| invalid())?;
        let id = Self::from_uuid(uuid);
        if id.0 != s {
            return Err(invalid());
        }
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (prefix plus first 8 characters of the UUID).
    pub fn short_id(&self) -> &str {
        let end = (REQUEST_ID_PREFIX.len() + 8).min(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.short_id())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh request identifiers.
///
/// The gateway mints through this trait so tests can substitute a
/// deterministic sequence.
pub trait TicketMinter: Send + Sync {
    fn mint(&self) -> RequestId;
}

/// Default minter backed by random UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidMinter;

impl TicketMinter for UuidMinter {
    fn mint(&self) -> RequestId {
        RequestId::mint()
    }
}

//! Content identifiers issued by the content-addressed store.
//!
//! Only identifiers that match the canonical CID grammar are ever handed to
//! the network layer. Anything else is rejected up front.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base58btc alphabet (no `0`, `O`, `I`, `l`)
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// CIDv0 total length: `Qm` + 44 base58 characters
pub const CID_V0_LEN: usize = 46;

/// Bounds for base32 CIDv1 strings (multibase prefix included)
pub const CID_V1_MIN_LEN: usize = 50;
pub const CID_V1_MAX_LEN: usize = 120;

/// Rejected identifier string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content identifier")]
pub struct InvalidIdentifier;

/// Validated content identifier (CIDv0 or base32 CIDv1)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Parse and validate a content identifier.
    pub fn parse(raw: &str) -> Result<Self, InvalidIdentifier> {
        if is_valid_content_id(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidIdentifier)
        }
    }

    /// Wrap an identifier built locally from a digest.
    pub(crate) fn from_digest_encoding(encoded: String) -> Self {
        debug_assert!(is_valid_content_id(&encoded));
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// CID version (0 or 1)
    pub fn version(&self) -> u8 {
        if self.0.starts_with("Qm") {
            0
        } else {
            1
        }
    }
}

/// Check a string against the accepted CID grammar.
///
/// - CIDv0: `Qm` followed by exactly 44 base58btc characters
/// - CIDv1: `baf` multibase/version prefix, lowercase base32 (`a-z`, `2-7`)
pub fn is_valid_content_id(raw: &str) -> bool {
    if let Some(rest) = raw.strip_prefix("Qm") {
        return raw.len() == CID_V0_LEN && rest.chars().all(|c| BASE58_ALPHABET.contains(c));
    }

    raw.starts_with("baf")
        && (CID_V1_MIN_LEN..=CID_V1_MAX_LEN).contains(&raw.len())
        && raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c))
}

impl FromStr for ContentId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentId {
    type Error = InvalidIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_content_id(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidIdentifier)
        }
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

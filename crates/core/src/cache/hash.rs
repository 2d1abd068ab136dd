//! Cache key derivation.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;

/// Fixed-length key addressing one cached record.
///
/// Always 64 lowercase hex characters (a SHA-256 digest).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    pub const LEN: usize = 64;

    /// Parse a key received from outside the cache.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let valid = s.len() == Self::LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if valid { Ok(Self(s.to_string())) } else { Err(Error::InvalidHash) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Derive the cache key for a request identifier (usually a URL).
pub fn derive_key(identifier: &str) -> CacheKey {
    CacheKey(hex::encode(Sha256::digest(identifier.as_bytes())))
}

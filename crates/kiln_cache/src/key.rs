//! Cache keys.

use std::fmt;

use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

/// A fixed-length key identifying one cache entry.
///
/// Wraps the 128-bit fingerprint of an (input, options, engine version)
/// triple. Its 32-character hex form names the entry's files on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(ContentHash);

impl CacheKey {
    /// Wraps an already computed hash.
    pub fn from_hash(hash: ContentHash) -> Self {
        Self(hash)
    }

    /// Parses a key from its hex form, as found in entry file names.
    pub fn parse(s: &str) -> Option<Self> {
        ContentHash::from_hex(s).map(Self)
    }

    /// Returns the underlying hash.
    pub fn hash(&self) -> ContentHash {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.0)
    }
}

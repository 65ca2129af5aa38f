//! Entry markers.
//!
//! Every cache entry has a small `<key>.meta` file next to its `<key>.css`
//! content. The marker is published after the content, so its presence is
//! what makes an entry visible. It carries magic bytes, a format version,
//! and the length and checksum of the content for validation on read.

use std::path::Path;

use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a Kiln cache entry marker.
const ENTRY_MAGIC: [u8; 4] = *b"KILN";

/// Current marker format version. Increment on breaking changes to the
/// marker or content layout.
const ENTRY_FORMAT_VERSION: u32 = 1;

/// Header stored in an entry's marker file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryHeader {
    /// Magic bytes: must be `b"KILN"`.
    pub magic: [u8; 4],

    /// Marker format version.
    pub format_version: u32,

    /// Kiln version that wrote the entry.
    pub writer_version: String,

    /// Length of the content in bytes.
    pub length: u64,

    /// Content hash of the content bytes.
    pub checksum: ContentHash,
}

impl EntryHeader {
    /// Builds the header describing `data`.
    pub fn for_content(data: &[u8]) -> Self {
        Self {
            magic: ENTRY_MAGIC,
            format_version: ENTRY_FORMAT_VERSION,
            writer_version: env!("CARGO_PKG_VERSION").to_string(),
            length: data.len() as u64,
            checksum: ContentHash::from_bytes(data),
        }
    }

    /// Encodes the header into marker file bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })
    }

    /// Decodes and validates marker file bytes read from `path`.
    pub fn decode(path: &Path, raw: &[u8]) -> Result<Self, CacheError> {
        let invalid = |reason: String| CacheError::InvalidHeader {
            path: path.to_path_buf(),
            reason,
        };

        let (header, consumed): (EntryHeader, usize) =
            bincode::serde::decode_from_slice(raw, bincode::config::standard())
                .map_err(|e| invalid(e.to_string()))?;

        if consumed != raw.len() {
            return Err(invalid(format!(
                "{} trailing bytes after header",
                raw.len() - consumed
            )));
        }

        if header.magic != ENTRY_MAGIC {
            return Err(invalid("missing magic bytes".to_string()));
        }

        if header.format_version != ENTRY_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                path: path.to_path_buf(),
                expected: ENTRY_FORMAT_VERSION,
                actual: header.format_version,
            });
        }

        Ok(header)
    }

    /// Checks `data` against the recorded length and checksum.
    pub fn verify(&self, path: &Path, data: &[u8]) -> Result<(), CacheError> {
        self.verify_digest(path, data.len() as u64, ContentHash::from_bytes(data))
    }

    /// Checks an already computed length and checksum.
    pub fn verify_digest(
        &self,
        path: &Path,
        length: u64,
        checksum: ContentHash,
    ) -> Result<(), CacheError> {
        if length != self.length {
            return Err(CacheError::LengthMismatch {
                path: path.to_path_buf(),
                expected: self.length,
                actual: length,
            });
        }
        if checksum != self.checksum {
            return Err(CacheError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: self.checksum.to_string(),
                actual: checksum.to_string(),
            });
        }
        Ok(())
    }
}

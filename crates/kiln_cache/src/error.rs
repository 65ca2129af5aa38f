//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Reads are fail-safe: a bad entry is reported internally with one of
/// these variants and surfaces to callers as a cache miss. Writes and
/// opening the cache return them so the caller can decide to continue
/// without caching.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache directory cannot be created or written to.
    #[error("cache directory {path} is unavailable: {reason}")]
    Unavailable {
        /// The cache directory.
        path: PathBuf,
        /// Why the directory cannot be used.
        reason: String,
    },

    /// An entry marker has an invalid or missing header.
    #[error("invalid entry marker in {path}: {reason}")]
    InvalidHeader {
        /// The marker file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the checksum of the content.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The content file path.
        path: PathBuf,
        /// The checksum recorded in the marker.
        expected: String,
        /// The checksum computed from the content.
        actual: String,
    },

    /// The content length does not match the length recorded in the marker.
    #[error("truncated entry {path}: expected {expected} bytes, found {actual}")]
    LengthMismatch {
        /// The content file path.
        path: PathBuf,
        /// The length recorded in the marker.
        expected: u64,
        /// The length found on disk.
        actual: u64,
    },

    /// The marker format version does not match the current version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The marker file path.
        path: PathBuf,
        /// The expected format version.
        expected: u32,
        /// The actual format version found in the file.
        actual: u32,
    },

    /// An import target names no file in any search directory.
    #[error("cannot resolve import \"{target}\" from {from}")]
    UnresolvedImport {
        /// The target as written in the import rule.
        target: String,
        /// The importing file, or `<input>` for inline source.
        from: PathBuf,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache/abc.css"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("abc.css"));
    }

    #[test]
    fn unavailable_display() {
        let err = CacheError::Unavailable {
            path: PathBuf::from("/readonly/cache"),
            reason: "permission denied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("unavailable"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn invalid_header_display() {
        let err = CacheError::InvalidHeader {
            path: PathBuf::from("bad.meta"),
            reason: "missing magic bytes".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid entry marker"));
        assert!(msg.contains("missing magic bytes"));
    }

    #[test]
    fn checksum_mismatch_display() {
        let err = CacheError::ChecksumMismatch {
            path: PathBuf::from("file.css"),
            expected: "aabb".to_string(),
            actual: "ccdd".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("checksum mismatch"));
        assert!(msg.contains("aabb"));
        assert!(msg.contains("ccdd"));
    }

    #[test]
    fn length_mismatch_display() {
        let err = CacheError::LengthMismatch {
            path: PathBuf::from("file.css"),
            expected: 10,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 10 bytes"));
        assert!(msg.contains("found 4"));
    }

    #[test]
    fn unresolved_import_display() {
        let err = CacheError::UnresolvedImport {
            target: "theme".to_string(),
            from: PathBuf::from("scss/main.scss"),
        };
        assert_eq!(
            err.to_string(),
            "cannot resolve import \"theme\" from scss/main.scss"
        );
    }

    #[test]
    fn version_mismatch_display() {
        let err = CacheError::VersionMismatch {
            path: PathBuf::from("old.meta"),
            expected: 2,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("version mismatch"));
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("got 1"));
    }
}

//! Non-fatal events reported alongside a compilation result.

use std::fmt;

use kiln_cache::LimitViolation;

/// Something the caller may want to tell the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Caching was requested but could not be used for this request.
    CacheUnavailable {
        /// Why the cache was bypassed.
        reason: String,
    },
    /// The result was compiled but could not be stored.
    CacheWriteFailed {
        /// The store error.
        reason: String,
    },
    /// The cache directory exceeds a configured limit.
    CacheOverLimit(LimitViolation),
    /// Attachments exist but were not written.
    AttachmentsSkipped {
        /// Number of attachments skipped.
        count: usize,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::CacheUnavailable { reason } => write!(f, "cache unavailable: {reason}"),
            Notice::CacheWriteFailed { reason } => write!(f, "could not store result: {reason}"),
            Notice::CacheOverLimit(violation) => write!(f, "{violation}"),
            Notice::AttachmentsSkipped { count } => write!(
                f,
                "{count} attachment(s) not written; pass --write-attachments always to copy them"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let notice = Notice::AttachmentsSkipped { count: 2 };
        assert!(notice.to_string().starts_with("2 attachment(s) not written"));

        let notice = Notice::CacheOverLimit(LimitViolation::Entries {
            actual: 3,
            limit: 2,
        });
        assert_eq!(notice.to_string(), "cache holds 3 entries, limit is 2");
    }
}

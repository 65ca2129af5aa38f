//! The cache handle.
//!
//! A [`CssCache`] is opened once per process (or per session) and shared by
//! reference. It owns an [`EntryStore`], the configured limits, and session
//! counters. All methods take `&self`, so one handle can serve several
//! threads at once.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use kiln_common::ByteSize;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::key::CacheKey;
use crate::store::{EntryStore, PROBE_PREFIX};

/// Optional size and entry-count limits.
///
/// Limits are only reported through [`CssCache::over_limit`]. Nothing is
/// evicted automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLimits {
    /// Maximum total size of the cache directory.
    pub max_size: Option<ByteSize>,
    /// Maximum number of entries.
    pub max_entries: Option<u64>,
}

/// A snapshot of what the cache directory holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Complete entries.
    pub entries: u64,
    /// Bytes used by entries and staged files.
    pub total_bytes: u64,
    /// Staged files left by interrupted writers.
    pub temp_files: u64,
}

/// Counters for one session of a [`CssCache`] handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Lookups that found a valid entry.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Successful stores.
    pub stores: u64,
    /// Stores that failed.
    pub store_failures: u64,
}

/// A limit the cache currently exceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitViolation {
    /// Total size is above `max_size`.
    Size {
        /// Current size.
        actual: ByteSize,
        /// Configured limit.
        limit: ByteSize,
    },
    /// Entry count is above `max_entries`.
    Entries {
        /// Current entry count.
        actual: u64,
        /// Configured limit.
        limit: u64,
    },
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitViolation::Size { actual, limit } => {
                write!(f, "cache size {actual} exceeds limit {limit}")
            }
            LimitViolation::Entries { actual, limit } => {
                write!(f, "cache holds {actual} entries, limit is {limit}")
            }
        }
    }
}

/// An open compilation cache.
#[derive(Debug)]
pub struct CssCache {
    store: EntryStore,
    limits: CacheLimits,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    store_failures: AtomicU64,
}

impl CssCache {
    /// Opens (creating if needed) the cache directory at `dir`.
    ///
    /// Writes and removes a throwaway file to make sure the directory is
    /// usable. Returns [`CacheError::Unavailable`] otherwise.
    pub fn open(dir: &Path, limits: CacheLimits) -> Result<Self, CacheError> {
        let unavailable = |reason: String| CacheError::Unavailable {
            path: dir.to_path_buf(),
            reason,
        };

        std::fs::create_dir_all(dir).map_err(|e| unavailable(e.to_string()))?;
        let probe = tempfile::Builder::new()
            .prefix(PROBE_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| unavailable(e.to_string()))?;
        drop(probe);

        debug!(dir = %dir.display(), "opened cache");
        Ok(Self {
            store: EntryStore::new(dir),
            limits,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
        })
    }

    /// Returns the cache directory.
    pub fn dir(&self) -> &Path {
        self.store.root()
    }

    /// Returns the configured limits.
    pub fn limits(&self) -> CacheLimits {
        self.limits
    }

    /// Returns `true` iff a complete entry for `key` is present.
    pub fn exists(&self, key: &CacheKey) -> bool {
        self.store.exists(key)
    }

    /// Fetches an entry's content into memory.
    pub fn get_content(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let found = self.store.read(key);
        self.record_lookup(key, found.is_some());
        found
    }

    /// Copies an entry's content to `dest`. Returns `false` on a miss.
    pub fn get_to_file(&self, key: &CacheKey, dest: &Path) -> bool {
        let hit = self.store.copy_to(key, dest);
        self.record_lookup(key, hit);
        hit
    }

    /// Stores `data` under `key`.
    pub fn set_content(&self, key: &CacheKey, data: &[u8]) -> Result<(), CacheError> {
        match self.store.write(key, data) {
            Ok(()) => {
                self.stores.fetch_add(1, Ordering::Relaxed);
                debug!(%key, bytes = data.len(), "cache store");
                Ok(())
            }
            Err(e) => {
                self.store_failures.fetch_add(1, Ordering::Relaxed);
                warn!(%key, error = %e, "cache store failed");
                Err(e)
            }
        }
    }

    fn record_lookup(&self, key: &CacheKey, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(%key, "cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(%key, "cache miss");
        }
    }

    /// Scans the directory and reports what it holds.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let summary = self.store.scan()?;
        Ok(CacheStats {
            entries: summary.entries,
            total_bytes: summary.total_bytes,
            temp_files: summary.temp_files,
        })
    }

    /// Compares current usage with the configured limits.
    ///
    /// Returns the first limit exceeded, size before entry count.
    pub fn over_limit(&self) -> Result<Option<LimitViolation>, CacheError> {
        if self.limits == CacheLimits::default() {
            return Ok(None);
        }
        let stats = self.stats()?;
        if let Some(limit) = self.limits.max_size {
            if stats.total_bytes > limit.bytes() {
                return Ok(Some(LimitViolation::Size {
                    actual: ByteSize::new(stats.total_bytes),
                    limit,
                }));
            }
        }
        if let Some(limit) = self.limits.max_entries {
            if stats.entries > limit {
                return Ok(Some(LimitViolation::Entries {
                    actual: stats.entries,
                    limit,
                }));
            }
        }
        Ok(None)
    }

    /// Removes every entry and stray staged file. Returns the number of
    /// files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let removed = self.store.clear()?;
        debug!(dir = %self.dir().display(), removed, "cleared cache");
        Ok(removed)
    }

    /// Returns the session counters so far.
    pub fn session(&self) -> SessionStats {
        SessionStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }

    /// Ends the session and returns its counters.
    pub fn close(self) -> SessionStats {
        let session = self.session();
        debug!(
            hits = session.hits,
            misses = session.misses,
            stores = session.stores,
            "closed cache"
        );
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::ContentHash;

    fn key(s: &str) -> CacheKey {
        CacheKey::from_hash(ContentHash::from_bytes(s.as_bytes()))
    }

    fn open_cache(limits: CacheLimits) -> (tempfile::TempDir, CssCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CssCache::open(&dir.path().join("kiln"), limits).unwrap();
        (dir, cache)
    }

    #[test]
    fn open_creates_directory_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("cache");
        let cache = CssCache::open(&root, CacheLimits::default()).unwrap();
        assert!(root.is_dir());
        assert_eq!(cache.dir(), root);
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn open_on_regular_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let err = CssCache::open(&file, CacheLimits::default()).unwrap_err();
        assert!(matches!(err, CacheError::Unavailable { .. }));
    }

    #[test]
    fn miss_then_hit_counts() {
        let (_dir, cache) = open_cache(CacheLimits::default());
        let k = key("a");
        assert!(cache.get_content(&k).is_none());
        cache.set_content(&k, b"a { b: c; }\n").unwrap();
        assert!(cache.exists(&k));
        assert_eq!(cache.get_content(&k).unwrap(), b"a { b: c; }\n");

        let session = cache.close();
        assert_eq!(
            session,
            SessionStats {
                hits: 1,
                misses: 1,
                stores: 1,
                store_failures: 0,
            }
        );
    }

    #[test]
    fn get_to_file_counts_and_copies() {
        let (dir, cache) = open_cache(CacheLimits::default());
        let k = key("file");
        let dest = dir.path().join("out.css");
        assert!(!cache.get_to_file(&k, &dest));
        cache.set_content(&k, b"x {}\n").unwrap();
        assert!(cache.get_to_file(&k, &dest));
        assert_eq!(std::fs::read(&dest).unwrap(), b"x {}\n");
        assert_eq!(cache.session().hits, 1);
        assert_eq!(cache.session().misses, 1);
    }

    #[test]
    fn store_failure_is_counted() {
        let (_dir, cache) = open_cache(CacheLimits::default());
        let root = cache.dir().to_path_buf();
        std::fs::remove_dir(&root).unwrap();
        std::fs::write(&root, b"blocked").unwrap();

        assert!(cache.set_content(&key("a"), b"a {}").is_err());
        assert_eq!(cache.session().store_failures, 1);
        assert_eq!(cache.session().stores, 0);
    }

    #[test]
    fn stats_and_clear() {
        let (_dir, cache) = open_cache(CacheLimits::default());
        cache.set_content(&key("a"), b"12345").unwrap();
        cache.set_content(&key("b"), b"67890").unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert!(stats.total_bytes >= 10);

        assert_eq!(cache.clear().unwrap(), 4);
        assert_eq!(cache.stats().unwrap(), CacheStats::default());
        assert!(cache.get_content(&key("a")).is_none());
    }

    #[test]
    fn no_limits_never_violated() {
        let (_dir, cache) = open_cache(CacheLimits::default());
        cache.set_content(&key("a"), &[b'x'; 4096]).unwrap();
        assert_eq!(cache.over_limit().unwrap(), None);
    }

    #[test]
    fn entry_limit_reported() {
        let (_dir, cache) = open_cache(CacheLimits {
            max_size: None,
            max_entries: Some(1),
        });
        cache.set_content(&key("a"), b"a").unwrap();
        assert_eq!(cache.over_limit().unwrap(), None);
        cache.set_content(&key("b"), b"b").unwrap();
        assert_eq!(
            cache.over_limit().unwrap(),
            Some(LimitViolation::Entries {
                actual: 2,
                limit: 1
            })
        );
        // Reporting only: both entries are still there.
        assert!(cache.exists(&key("a")));
        assert!(cache.exists(&key("b")));
    }

    #[test]
    fn size_limit_reported() {
        let (_dir, cache) = open_cache(CacheLimits {
            max_size: Some(ByteSize::new(1024)),
            max_entries: None,
        });
        cache.set_content(&key("big"), &[b'x'; 2048]).unwrap();
        let violation = cache.over_limit().unwrap().unwrap();
        assert!(matches!(violation, LimitViolation::Size { .. }));
        assert!(violation.to_string().contains("exceeds limit 1KB"));
    }

    #[test]
    fn shared_handle_across_threads() {
        let (_dir, cache) = open_cache(CacheLimits::default());
        let k = key("shared");
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    cache.set_content(&k, b"p { q: r; }\n").unwrap();
                    assert_eq!(cache.get_content(&k).unwrap(), b"p { q: r; }\n");
                });
            }
        });
        let session = cache.session();
        assert_eq!(session.stores, 4);
        assert_eq!(session.hits, 4);
    }

    #[test]
    fn session_stats_serialize() {
        let json = serde_json::to_string(&SessionStats::default()).unwrap();
        assert!(json.contains("\"store_failures\":0"));
    }
}

//! Directory-backed, content-addressed entry storage.
//!
//! Layout under the cache root:
//!
//! ```text
//! <key>.css       compiled content
//! <key>.meta      marker (written last, see `entry`)
//! <key>.tmp-XXXX  in-progress writes
//! ```
//!
//! Writers stage bytes in a temporary file inside the root and rename it
//! into place, so readers see either a complete file or none. Readers take
//! no locks.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use kiln_common::{ContentHash, ContentHasher};
use tracing::debug;

use crate::entry::EntryHeader;
use crate::error::CacheError;
use crate::key::CacheKey;

/// File extension for entry content.
pub const CONTENT_EXT: &str = "css";

/// File extension for entry markers.
pub const MARKER_EXT: &str = "meta";

/// Infix of staged files: `<key>.tmp-<random>`.
const TEMP_INFIX: &str = ".tmp-";

/// Prefix of the throwaway files used to probe writability.
pub(crate) const PROBE_PREFIX: &str = ".probe-";

/// Counts of what a directory scan found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Complete entries (markers present).
    pub entries: u64,
    /// Total size of all cache-owned files, in bytes.
    pub total_bytes: u64,
    /// Staged files left behind by interrupted writers.
    pub temp_files: u64,
}

/// Flat, content-addressed store of cache entries.
#[derive(Debug, Clone)]
pub struct EntryStore {
    /// Root cache directory.
    root: PathBuf,
}

impl EntryStore {
    /// Creates a store rooted at the given directory. Nothing is touched on disk.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensures that the root directory exists.
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.root).map_err(|e| CacheError::Io {
            path: self.root.clone(),
            source: e,
        })
    }

    /// Returns the path of an entry file with the given extension.
    pub fn entry_path(&self, key: &CacheKey, ext: &str) -> PathBuf {
        self.root.join(format!("{key}.{ext}"))
    }

    /// Returns `true` iff a complete entry for `key` is present.
    ///
    /// Checks the marker and the content length; the checksum is verified
    /// on read.
    pub fn exists(&self, key: &CacheKey) -> bool {
        let Ok(header) = self.read_marker(key) else {
            return false;
        };
        let content = self.entry_path(key, CONTENT_EXT);
        std::fs::metadata(&content)
            .map(|m| m.is_file() && m.len() == header.length)
            .unwrap_or(false)
    }

    /// Reads an entry's content, validating it against its marker.
    ///
    /// Returns `None` on a miss or when the entry is incomplete or corrupt.
    pub fn read(&self, key: &CacheKey) -> Option<Vec<u8>> {
        match self.try_read(key) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(%key, error = %e, "cache entry unreadable");
                None
            }
        }
    }

    fn try_read(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        let header = self.read_marker(key)?;
        let path = self.entry_path(key, CONTENT_EXT);
        let data = std::fs::read(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        header.verify(&path, &data)?;
        Ok(data)
    }

    /// Copies an entry's content to `dest` without holding it in memory.
    ///
    /// The content is streamed into a temporary file beside `dest` while
    /// being hashed, and only renamed over `dest` once length and checksum
    /// match the marker. Returns `false` on a miss or any failure; `dest` is
    /// left untouched in that case.
    pub fn copy_to(&self, key: &CacheKey, dest: &Path) -> bool {
        match self.try_copy_to(key, dest) {
            Ok(()) => true,
            Err(e) => {
                debug!(%key, dest = %dest.display(), error = %e, "cache entry not copied");
                false
            }
        }
    }

    fn try_copy_to(&self, key: &CacheKey, dest: &Path) -> Result<(), CacheError> {
        let header = self.read_marker(key)?;
        let path = self.entry_path(key, CONTENT_EXT);
        let source = File::open(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;

        let dest_dir = parent_dir(dest);
        let mut staged = tempfile::Builder::new()
            .prefix(".kiln-")
            .suffix(".tmp")
            .tempfile_in(dest_dir)
            .map_err(|e| CacheError::Io {
                path: dest_dir.to_path_buf(),
                source: e,
            })?;

        let mut reader = HashingReader::new(source);
        let copied = io::copy(&mut reader, &mut staged).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        header.verify_digest(&path, copied, reader.finish())?;

        staged.persist(dest).map_err(|e| CacheError::Io {
            path: dest.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    /// Stores `data` under `key`.
    ///
    /// Content is published first and the marker last, each by an atomic
    /// rename. Concurrent writers of the same key with the same bytes leave
    /// a valid entry whichever rename lands last.
    pub fn write(&self, key: &CacheKey, data: &[u8]) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let marker = EntryHeader::for_content(data).encode()?;
        self.publish(key, CONTENT_EXT, data)?;
        self.publish(key, MARKER_EXT, &marker)
    }

    fn publish(&self, key: &CacheKey, ext: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let dest = self.entry_path(key, ext);
        let io_err = |source: io::Error| CacheError::Io {
            path: dest.clone(),
            source,
        };

        let mut staged = tempfile::Builder::new()
            .prefix(&format!("{key}{TEMP_INFIX}"))
            .tempfile_in(&self.root)
            .map_err(|e| CacheError::Io {
                path: self.root.clone(),
                source: e,
            })?;
        staged.write_all(bytes).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged.persist(&dest).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn read_marker(&self, key: &CacheKey) -> Result<EntryHeader, CacheError> {
        let path = self.entry_path(key, MARKER_EXT);
        let raw = std::fs::read(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        EntryHeader::decode(&path, &raw)
    }

    /// Scans the root and summarizes what it holds.
    ///
    /// Files whose names do not belong to the cache are ignored.
    pub fn scan(&self) -> Result<ScanSummary, CacheError> {
        let mut summary = ScanSummary::default();
        for (path, kind) in self.owned_files()? {
            let len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            summary.total_bytes += len;
            match kind {
                OwnedFile::Marker => summary.entries += 1,
                OwnedFile::Staged => summary.temp_files += 1,
                OwnedFile::Content => {}
            }
        }
        Ok(summary)
    }

    /// Removes every cache-owned file. Returns the number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        // Markers first, so no entry is ever visible without its content.
        let mut files = self.owned_files()?;
        files.sort_by_key(|(_, kind)| *kind != OwnedFile::Marker);
        for (path, _) in files {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::Io { path, source: e }),
            }
        }
        Ok(removed)
    }

    fn owned_files(&self) -> Result<Vec<(PathBuf, OwnedFile)>, CacheError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.root.clone(),
                    source: e,
                })
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io {
                path: self.root.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(kind) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(classify)
            {
                files.push((path, kind));
            }
        }
        Ok(files)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnedFile {
    Content,
    Marker,
    Staged,
}

/// Recognizes `<key>.css`, `<key>.meta`, `<key>.tmp-*`, and probe files.
fn classify(name: &str) -> Option<OwnedFile> {
    if name.starts_with(PROBE_PREFIX) {
        return Some(OwnedFile::Staged);
    }
    if let Some((stem, _)) = name.split_once(TEMP_INFIX) {
        return CacheKey::parse(stem).map(|_| OwnedFile::Staged);
    }
    let (stem, ext) = name.rsplit_once('.')?;
    CacheKey::parse(stem)?;
    match ext {
        CONTENT_EXT => Some(OwnedFile::Content),
        MARKER_EXT => Some(OwnedFile::Marker),
        _ => None,
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Reader adapter that hashes everything passing through it.
struct HashingReader<R> {
    inner: R,
    hasher: ContentHasher,
}

impl<R: Read> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: ContentHasher::new(),
        }
    }

    fn finish(&self) -> ContentHash {
        self.hasher.finish()
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

//! Filesystem QR cache
//!
//! Flat directory, no index: file existence and mtime are the only metadata.
//!
//! | Tier       | File               | Contents                         |
//! |------------|--------------------|----------------------------------|
//! | `Valid`    | `{key}.png`        | downloaded from the event server |
//! | `Fallback` | `{key}_local.png`  | generated locally, NOT scannable |
//!
//! Writes go through a temp file in the same directory followed by a rename,
//! so a concurrent reader sees either the old file or the complete new one.

use crate::utils::{atomic_write, is_write_leftover};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Cache tier of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Valid,
    Fallback,
}

impl CacheTier {
    /// File name of `key` in this tier
    pub fn file_name(&self, key: &str) -> String {
        match self {
            CacheTier::Valid => format!("{}.png", key),
            CacheTier::Fallback => format!("{}_local.png", key),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache directory {path} unavailable: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache write {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Storage seam for the resolver: read by key and tier, write by key and tier
pub trait QrStore: Send + Sync {
    fn read(&self, key: &str, tier: CacheTier) -> Option<Vec<u8>>;

    fn write(&self, key: &str, tier: CacheTier, bytes: &[u8]) -> Result<PathBuf, CacheError>;

    fn write_valid(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        self.write(key, CacheTier::Valid, bytes)
    }

    fn write_fallback(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        self.write(key, CacheTier::Fallback, bytes)
    }
}

/// [`QrStore`] backed by a flat directory
#[derive(Debug, Clone)]
pub struct FsQrCache {
    dir: PathBuf,
}

impl FsQrCache {
    /// The directory is created lazily on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str, tier: CacheTier) -> PathBuf {
        self.dir.join(tier.file_name(key))
    }

    /// Valid-tier entry
    pub fn read_valid(&self, key: &str) -> Option<Vec<u8>> {
        self.read(key, CacheTier::Valid)
    }

    /// Fallback-tier entry
    pub fn read_fallback(&self, key: &str) -> Option<Vec<u8>> {
        self.read(key, CacheTier::Fallback)
    }

    /// Delete every cached PNG (both tiers) whose mtime is older than `max_age`
    ///
    /// A missing cache directory is not an error; nothing is deleted. Temp
    /// files left by an interrupted write are removed on the same age rule
    /// but not counted.
    pub fn purge_older_than(&self, max_age: Duration) -> Result<usize, CacheError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Cache directory absent, nothing to purge");
                return Ok(0);
            }
            Err(source) => {
                return Err(CacheError::Directory {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let now = SystemTime::now();
        let mut deleted = 0;

        for entry in entries.flatten() {
            let path = entry.path();
            let leftover = is_write_leftover(&path);
            if !leftover && !is_png(&path) {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read cache entry mtime");
                    continue;
                }
            };

            // Entries dated in the future count as fresh
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= max_age {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) if leftover => {
                    debug!(path = %path.display(), "Removed temp file from an interrupted write");
                }
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "Purged cache entry");
                    deleted += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Cannot delete cache entry"),
            }
        }

        Ok(deleted)
    }
}

impl QrStore for FsQrCache {
    fn read(&self, key: &str, tier: CacheTier) -> Option<Vec<u8>> {
        let path = self.path_for(key, tier);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache entry unreadable, treating as absent");
                None
            }
        }
    }

    fn write(&self, key: &str, tier: CacheTier, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CacheError::Directory {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(key, tier);
        atomic_write(&path, bytes).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "Cached QR image");
        Ok(path)
    }
}

fn is_png(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false)
}

/// Purge cache entries older than `max_age_days` days, returning the count
///
/// Failures are logged and reported as zero deletions.
pub fn clean_cache(dir: &Path, max_age_days: u64) -> usize {
    let max_age = Duration::from_secs(max_age_days.saturating_mul(SECONDS_PER_DAY));

    match FsQrCache::new(dir).purge_older_than(max_age) {
        Ok(deleted) => {
            info!(
                dir = %dir.display(),
                max_age_days,
                deleted,
                "Cache cleanup complete"
            );
            deleted
        }
        Err(e) => {
            warn!(error = %e, "Cache cleanup failed");
            0
        }
    }
}

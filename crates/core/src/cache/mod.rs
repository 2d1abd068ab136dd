//! File-backed result cache for expensive page fetches.
//!
//! Layout of the storage directory:
//!
//! - `<key>.json`: one record per cache key, holding the payload and metadata
//! - `index.json`: aggregate index of `{identifier, created_at, expires_at}` per key
//!
//! Keys are SHA-256 digests of the request identifier. Reads never fail for
//! absent, expired or corrupt records; those are all a [`Lookup::Miss`].

mod atomic;
pub mod clock;
pub mod entry;
pub mod hash;
pub mod index;
pub mod sweep;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use crate::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, effective_ttl};
pub use hash::{CacheKey, derive_key};
pub use index::IndexRecord;
pub use sweep::{CacheStats, spawn_sweeper};

use entry::EntryStore;
use index::Index;

/// Caller-supplied auxiliary fields stored alongside a payload.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// TTL applied when a write does not name one.
pub const DEFAULT_TTL_HOURS: u32 = 24;

/// Longest TTL a write can carry, one hundred years. Longer requests are clamped.
pub const MAX_TTL_HOURS: u32 = 24 * 365 * 100;

/// Construction parameters for [`FileCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the records and the index. Created if absent.
    pub dir: PathBuf,
    pub default_ttl_hours: u32,
    /// Sweep expired entries when the cache is opened.
    pub sweep_on_open: bool,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), default_ttl_hours: DEFAULT_TTL_HOURS, sweep_on_open: true }
    }
}

/// A fresh cached value.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<P> {
    pub payload: P,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<P> {
    Hit(CacheHit<P>),
    Miss,
}

impl<P> Lookup<P> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn into_hit(self) -> Option<CacheHit<P>> {
        match self {
            Lookup::Hit(hit) => Some(hit),
            Lookup::Miss => None,
        }
    }
}

/// Handle to a cache directory.
///
/// Cheap to clone; clones share the index lock, so all writers in a process
/// should go through clones of one handle.
#[derive(Clone, Debug)]
pub struct FileCache {
    pub(crate) inner: Arc<Inner>,
}

#[derive(Debug)]
pub(crate) struct Inner {
    config: CacheConfig,
    pub(crate) entries: EntryStore,
    pub(crate) index: Index,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Open the cache described by `config` using the system clock.
    pub async fn open(config: CacheConfig) -> Result<Self, Error> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Open the cache with an explicit time source.
    ///
    /// Temporary files left behind by interrupted writes are removed, so a
    /// handle should be opened before other writers start on the directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the directory cannot be created, or if
    /// the opening sweep cannot update the store.
    pub async fn open_with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        tokio::fs::create_dir_all(&config.dir)
            .await
            .map_err(|e| Error::store(&config.dir, e))?;

        let cache = Self {
            inner: Arc::new(Inner {
                entries: EntryStore::new(&config.dir),
                index: Index::new(&config.dir),
                config,
                clock,
            }),
        };

        let stale = atomic::remove_stale(cache.dir()).await?;
        tracing::debug!(dir = %cache.dir().display(), stale, "opened page cache");

        if cache.config().sweep_on_open {
            cache.sweep().await?;
        }

        Ok(cache)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn dir(&self) -> &Path {
        &self.inner.config.dir
    }

    /// Current time according to the cache's clock; freshness is judged against it.
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");

        let cache = FileCache::open(CacheConfig::new(&cache_dir)).await.unwrap();
        assert!(cache_dir.is_dir());
        assert_eq!(cache.dir(), cache_dir.as_path());
        assert_eq!(cache.config().default_ttl_hours, DEFAULT_TTL_HOURS);
    }

    #[tokio::test]
    async fn test_open_on_file_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"").unwrap();

        let result = FileCache::open(CacheConfig::new(&file)).await;
        assert!(matches!(result, Err(Error::StoreUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_open_sweeps_expired() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = FileCache::open_with_clock(CacheConfig::new(dir.path()), clock.clone())
            .await
            .unwrap();
        cache.write("https://example.com", "a", &Metadata::new(), Some(1)).await.unwrap();
        clock.advance(TimeDelta::hours(2));

        let reopened = FileCache::open_with_clock(CacheConfig::new(dir.path()), clock.clone())
            .await
            .unwrap();
        assert!(!reopened.contains("https://example.com").await.unwrap());
        assert!(reopened.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_persist_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(CacheConfig::new(dir.path())).await.unwrap();
        cache.write("https://example.com", "a", &Metadata::new(), None).await.unwrap();
        drop(cache);

        let reopened = FileCache::open(CacheConfig::new(dir.path())).await.unwrap();
        let hit = reopened.read::<String>("https://example.com").await.unwrap();
        assert!(hit.is_hit());
    }

    #[tokio::test]
    async fn test_open_removes_stale_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(CacheConfig::new(dir.path())).await.unwrap();
        let key = cache.write("https://example.com", "a", &Metadata::new(), None).await.unwrap();
        drop(cache);

        let stale = dir.path().join(format!("{key}.999.3.tmp"));
        std::fs::write(&stale, b"{\"identifier\":").unwrap();

        let reopened = FileCache::open(CacheConfig::new(dir.path())).await.unwrap();
        assert!(!stale.exists());
        assert!(reopened.read::<String>("https://example.com").await.unwrap().is_hit());
    }

    #[tokio::test]
    async fn test_now_follows_clock() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let cache = FileCache::open_with_clock(CacheConfig::new(dir.path()), clock.clone())
            .await
            .unwrap();

        clock.advance(TimeDelta::hours(3));
        assert_eq!(cache.now(), start + TimeDelta::hours(3));
    }

    #[test]
    fn test_lookup_helpers() {
        let miss: Lookup<String> = Lookup::Miss;
        assert!(!miss.is_hit());
        assert!(miss.into_hit().is_none());
    }
}

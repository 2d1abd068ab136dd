//! Entry store: one JSON record file per cache key.
//!
//! Provides the write/read/delete path for cached payloads and the
//! read-through helper used by fetch callers.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::hash::{CacheKey, derive_key};
use super::index::IndexRecord;
use super::{CacheHit, FileCache, Lookup, MAX_TTL_HOURS, Metadata, atomic};
use crate::Error;

/// File extension of record files.
pub(crate) const RECORD_EXTENSION: &str = "json";

/// A persisted cache record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<P> {
    /// The request identifier the record was written for.
    pub identifier: String,
    pub payload: P,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<P> CacheEntry<P> {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expires_at, now)
    }
}

/// An entry is stale only once `now` is strictly past its expiry.
pub(crate) fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}

/// TTL actually applied for a requested number of hours.
pub fn effective_ttl(ttl_hours: u32) -> u32 {
    ttl_hours.min(MAX_TTL_HOURS)
}

/// Borrowed form of [`CacheEntry`] used on the write path.
#[derive(Serialize)]
struct EntryRef<'a, P: ?Sized> {
    identifier: &'a str,
    payload: &'a P,
    metadata: &'a Metadata,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Outcome of loading a record file.
#[derive(Debug)]
pub(crate) enum EntryRead<P> {
    Found(CacheEntry<P>),
    Absent,
    Corrupt(String),
}

/// Summary fields of a record, decoded without touching the payload type.
#[derive(Debug, Deserialize)]
struct EntrySummary {
    identifier: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Record files under the cache directory, addressed by key.
#[derive(Debug, Clone)]
pub(crate) struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    pub(crate) fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf() }
    }

    pub(crate) fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{RECORD_EXTENSION}"))
    }

    async fn write<P: Serialize + ?Sized>(&self, key: &CacheKey, entry: &EntryRef<'_, P>) -> Result<(), Error> {
        let bytes = serde_json::to_vec(entry)?;
        atomic::write(&self.path_for(key), &bytes).await
    }

    pub(crate) async fn read<P: DeserializeOwned>(&self, key: &CacheKey) -> Result<EntryRead<P>, Error> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(EntryRead::Absent),
            Err(e) => return Err(Error::store(path, e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(entry) => Ok(EntryRead::Found(entry)),
            Err(e) => Ok(EntryRead::Corrupt(e.to_string())),
        }
    }

    /// Remove the record for `key`. Returns whether a file was removed.
    pub(crate) async fn delete(&self, key: &CacheKey) -> Result<bool, Error> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::store(path, e)),
        }
    }

    pub(crate) async fn exists(&self, key: &CacheKey) -> Result<bool, Error> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path).await.map_err(|e| Error::store(path, e))
    }

    /// Read the summary of every record file in the directory.
    ///
    /// Malformed records are skipped with a warning.
    pub(crate) async fn scan(&self) -> Result<Vec<(CacheKey, IndexRecord)>, Error> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::store(&self.dir, e)),
        };

        let mut records = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(|e| Error::store(&self.dir, e))? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| CacheKey::parse(stem).ok())
            else {
                continue;
            };

            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::store(path, e)),
            };

            match serde_json::from_slice::<EntrySummary>(&bytes) {
                Ok(summary) => records.push((
                    key,
                    IndexRecord {
                        identifier: summary.identifier,
                        created_at: summary.created_at,
                        expires_at: summary.expires_at,
                    },
                )),
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping malformed cache record"),
            }
        }

        Ok(records)
    }
}

impl FileCache {
    /// Store `payload` for `identifier`, replacing any previous record.
    ///
    /// `ttl_hours` of `None` uses the configured default; values above
    /// [`MAX_TTL_HOURS`] are clamped. Returns the derived key.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the record or index cannot be written,
    /// `Encode` if the payload cannot be serialized.
    pub async fn write<P: Serialize + ?Sized>(
        &self, identifier: &str, payload: &P, metadata: &Metadata, ttl_hours: Option<u32>,
    ) -> Result<CacheKey, Error> {
        let (key, _) = self.write_entry(identifier, payload, metadata, ttl_hours).await?;
        Ok(key)
    }

    async fn write_entry<P: Serialize + ?Sized>(
        &self, identifier: &str, payload: &P, metadata: &Metadata, ttl_hours: Option<u32>,
    ) -> Result<(CacheKey, IndexRecord), Error> {
        let key = derive_key(identifier);
        let ttl_hours = effective_ttl(ttl_hours.unwrap_or(self.config().default_ttl_hours));
        let created_at = self.now();
        let expires_at = created_at
            .checked_add_signed(TimeDelta::hours(i64::from(ttl_hours)))
            .ok_or_else(|| Error::InvalidInput(format!("ttl of {ttl_hours} hours is out of range")))?;

        // Held across both files so a sweep cannot delete the new record
        // on the strength of the previous, expired index entry.
        let guard = self.inner.index.lock().await;

        let entry = EntryRef { identifier, payload, metadata, created_at, expires_at };
        self.inner.entries.write(&key, &entry).await?;

        let record = IndexRecord { identifier: identifier.to_string(), created_at, expires_at };
        self.inner.index.upsert(&guard, &key, record.clone()).await?;
        drop(guard);

        tracing::debug!(key = %key, identifier, %expires_at, "wrote cache entry");
        Ok((key, record))
    }

    /// Look up a fresh record for `identifier`.
    ///
    /// Absent, expired, corrupt and mismatched records all yield [`Lookup::Miss`].
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` only when the record file exists but cannot be read.
    pub async fn read<P: DeserializeOwned>(&self, identifier: &str) -> Result<Lookup<P>, Error> {
        let key = derive_key(identifier);
        let entry = match self.inner.entries.read::<P>(&key).await? {
            EntryRead::Found(entry) => entry,
            EntryRead::Absent => {
                tracing::debug!(key = %key, identifier, "cache miss");
                return Ok(Lookup::Miss);
            }
            EntryRead::Corrupt(reason) => {
                tracing::warn!(key = %key, identifier, error = %reason, "corrupt cache record, treating as miss");
                return Ok(Lookup::Miss);
            }
        };

        if entry.identifier != identifier {
            tracing::warn!(
                key = %key,
                identifier,
                stored = %entry.identifier,
                "cache record belongs to a different identifier, treating as miss"
            );
            return Ok(Lookup::Miss);
        }

        if entry.is_expired_at(self.now()) {
            tracing::debug!(key = %key, identifier, expires_at = %entry.expires_at, "cache entry expired");
            return Ok(Lookup::Miss);
        }

        tracing::debug!(key = %key, identifier, "cache hit");
        Ok(Lookup::Hit(CacheHit {
            payload: entry.payload,
            metadata: entry.metadata,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        }))
    }

    /// Remove the record and index entry for `key`. Missing keys are a no-op.
    ///
    /// Both are removed under the index lock, so a concurrent write of the same
    /// key lands either entirely before or entirely after the delete.
    pub async fn delete(&self, key: &CacheKey) -> Result<(), Error> {
        let guard = self.inner.index.lock().await;
        self.inner.entries.delete(key).await?;
        self.inner.index.remove(&guard, key).await?;
        Ok(())
    }

    /// Whether a record file exists for `identifier`, fresh or not.
    pub async fn contains(&self, identifier: &str) -> Result<bool, Error> {
        self.inner.entries.exists(&derive_key(identifier)).await
    }

    /// Return the cached value for `identifier`, or run `fetch` and cache its result.
    ///
    /// Concurrent callers for the same identifier are not coalesced; each miss
    /// runs its own fetch and the last write wins.
    pub async fn get_or_fetch<P, E, F, Fut>(
        &self, identifier: &str, ttl_hours: Option<u32>, fetch: F,
    ) -> Result<CacheHit<P>, E>
    where
        P: Serialize + DeserializeOwned,
        E: From<Error>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(P, Metadata), E>>,
    {
        if let Lookup::Hit(hit) = self.read::<P>(identifier).await? {
            return Ok(hit);
        }

        let (payload, metadata) = fetch().await?;
        let (_, record) = self.write_entry(identifier, &payload, &metadata, ttl_hours).await?;

        Ok(CacheHit { payload, metadata, created_at: record.created_at, expires_at: record.expires_at })
    }
}

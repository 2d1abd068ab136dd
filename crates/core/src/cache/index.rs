//! Aggregate index of live cache keys.
//!
//! The index is a single pretty-printed JSON document mapping each key to a
//! summary of its record. Every mutation rewrites the whole document; at the
//! scale of one scraping session (hundreds to low thousands of URLs) that is
//! cheap and keeps the file readable by hand.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use super::entry::is_expired;
use super::hash::CacheKey;
use super::{FileCache, atomic};
use crate::Error;

/// File name of the index document inside the cache directory.
pub const INDEX_FILE: &str = "index.json";

/// Summary of one cached record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct IndexRecord {
    pub identifier: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IndexRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expires_at, now)
    }
}

pub(crate) type IndexDoc = BTreeMap<CacheKey, IndexRecord>;

/// Handle to the index document.
///
/// Read-modify-write cycles are serialized by an in-process lock so that
/// concurrent writes for different keys do not drop each other's records.
/// Mutations require the guard from [`Index::lock`], which callers also hold
/// across the matching record file change.
#[derive(Debug)]
pub(crate) struct Index {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Index {
    pub(crate) fn new(dir: &Path) -> Self {
        Self { path: dir.join(INDEX_FILE), lock: Mutex::new(()) }
    }

    /// Hold the index for a multi-step update.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Load the document as stored.
    ///
    /// A missing document is an empty index. A malformed one is `IndexCorrupt`.
    pub(crate) async fn load(&self) -> Result<IndexDoc, Error> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IndexDoc::new()),
            Err(e) => return Err(Error::store(&self.path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| Error::IndexCorrupt(e.to_string()))
    }

    /// Load the document, falling back to an empty index if it is corrupt.
    pub(crate) async fn load_or_reset(&self) -> Result<IndexDoc, Error> {
        match self.load().await {
            Err(Error::IndexCorrupt(reason)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %reason,
                    "cache index is corrupt, resetting to empty"
                );
                Ok(IndexDoc::new())
            }
            other => other,
        }
    }

    pub(crate) async fn save(&self, doc: &IndexDoc) -> Result<(), Error> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        atomic::write(&self.path, &bytes).await
    }

    /// Insert or replace the record for `key`.
    ///
    /// Takes the held guard so the record file write and this update form one
    /// step with respect to sweeps and deletes.
    pub(crate) async fn upsert(
        &self, _held: &MutexGuard<'_, ()>, key: &CacheKey, record: IndexRecord,
    ) -> Result<(), Error> {
        let mut doc = self.load_or_reset().await?;
        doc.insert(key.clone(), record);
        self.save(&doc).await
    }

    /// Drop the record for `key`. Returns whether one was present.
    pub(crate) async fn remove(&self, _held: &MutexGuard<'_, ()>, key: &CacheKey) -> Result<bool, Error> {
        let mut doc = self.load_or_reset().await?;
        if doc.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&doc).await?;
        Ok(true)
    }

    pub(crate) async fn list_all(&self) -> Result<Vec<(CacheKey, IndexRecord)>, Error> {
        Ok(self.load_or_reset().await?.into_iter().collect())
    }
}

impl FileCache {
    /// Every indexed key with its summary. Order is unspecified.
    pub async fn list_all(&self) -> Result<Vec<(CacheKey, IndexRecord)>, Error> {
        self.inner.index.list_all().await
    }

    /// Rebuild the index from the record files on disk.
    ///
    /// Recovers enumeration (and therefore sweeping) after the index was lost
    /// or reset. Returns the number of records indexed.
    pub async fn rebuild_index(&self) -> Result<usize, Error> {
        let _guard = self.inner.index.lock().await;
        let doc: IndexDoc = self.inner.entries.scan().await?.into_iter().collect();
        self.inner.index.save(&doc).await?;

        tracing::info!(indexed = doc.len(), "rebuilt cache index from records");
        Ok(doc.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::cache::hash::derive_key;
    use crate::cache::{CacheConfig, Metadata};

    fn record(identifier: &str) -> IndexRecord {
        let now = Utc::now();
        IndexRecord { identifier: identifier.to_string(), created_at: now, expires_at: now + TimeDelta::hours(24) }
    }

    #[tokio::test]
    async fn test_upsert_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(dir.path());

        index.upsert(&index.lock().await, &derive_key("a"), record("a")).await.unwrap();
        index.upsert(&index.lock().await, &derive_key("b"), record("b")).await.unwrap();
        index.upsert(&index.lock().await, &derive_key("a"), record("a")).await.unwrap();

        let listed = index.list_all().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|(k, r)| *k == derive_key("b") && r.identifier == "b"));
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(dir.path());
        index.upsert(&index.lock().await, &derive_key("a"), record("a")).await.unwrap();

        assert!(index.remove(&index.lock().await, &derive_key("a")).await.unwrap());
        assert!(!index.remove(&index.lock().await, &derive_key("a")).await.unwrap());
        assert!(index.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(dir.path());
        assert!(index.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(dir.path());
        index.upsert(&index.lock().await, &derive_key("a"), record("a")).await.unwrap();

        let bytes = std::fs::read(&index.path).unwrap();
        std::fs::write(&index.path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(index.load().await, Err(Error::IndexCorrupt(_))));
        assert!(index.load_or_reset().await.unwrap().is_empty());

        index.upsert(&index.lock().await, &derive_key("b"), record("b")).await.unwrap();
        assert_eq!(index.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_document_is_keyed_by_cache_key() {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(dir.path());
        let url = "https://example.com";
        index.upsert(&index.lock().await, &derive_key(url), record(url)).await.unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&index.path).unwrap()).unwrap();
        let entry = &raw[derive_key("https://example.com").as_str()];
        assert_eq!(entry["identifier"], "https://example.com");
        assert!(entry["created_at"].is_string());
        assert!(entry["expires_at"].is_string());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(CacheConfig::new(dir.path())).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let url = format!("https://example.com/{i}");
                cache.write(&url, "body", &Metadata::new(), Some(1)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.list_all().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_rebuild_index_from_records() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(CacheConfig::new(dir.path())).await.unwrap();
        cache.write("https://a.example", "a", &Metadata::new(), Some(1)).await.unwrap();
        cache.write("https://b.example", "b", &Metadata::new(), Some(1)).await.unwrap();
        std::fs::write(dir.path().join("not-a-key.json"), b"{}").unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), b"garbage").unwrap();

        assert!(cache.list_all().await.unwrap().is_empty());
        assert_eq!(cache.rebuild_index().await.unwrap(), 2);

        let mut identifiers: Vec<_> = cache
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|(_, r)| r.identifier)
            .collect();
        identifiers.sort();
        assert_eq!(identifiers, vec!["https://a.example", "https://b.example"]);
    }
}

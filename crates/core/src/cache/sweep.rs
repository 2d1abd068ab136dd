//! Expiry sweeping and index statistics.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::FileCache;
use super::hash::CacheKey;
use crate::Error;

/// Counts of indexed entries by freshness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheStats {
    pub active_count: usize,
    pub expired_count: usize,
}

impl FileCache {
    /// Delete every expired record and its index entry.
    ///
    /// The index is rewritten once at the end. Records already missing from
    /// disk are still dropped from the index. Returns the number of entries removed.
    pub async fn sweep(&self) -> Result<usize, Error> {
        let now = self.now();
        let _guard = self.inner.index.lock().await;
        let mut doc = self.inner.index.load_or_reset().await?;

        let expired: Vec<CacheKey> = doc
            .iter()
            .filter(|(_, record)| record.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if !self.inner.entries.delete(key).await? {
                tracing::debug!(key = %key, "expired record already gone");
            }
            doc.remove(key);
        }

        self.inner.index.save(&doc).await?;

        if expired.is_empty() {
            tracing::debug!("cache sweep: no expired entries");
        } else {
            tracing::info!(removed = expired.len(), remaining = doc.len(), "cache sweep removed expired entries");
        }

        Ok(expired.len())
    }

    /// Count active and expired entries from the index without modifying anything.
    pub async fn stats(&self) -> Result<CacheStats, Error> {
        let now = self.now();
        let stats = self
            .inner
            .index
            .list_all()
            .await?
            .iter()
            .fold(CacheStats::default(), |mut stats, (_, record)| {
                if record.is_expired_at(now) {
                    stats.expired_count += 1;
                } else {
                    stats.active_count += 1;
                }
                stats
            });
        Ok(stats)
    }
}

/// Spawn a background task that sweeps the cache every `interval`.
///
/// Sweep failures are logged and the loop keeps running. Abort the returned
/// handle to stop it.
pub fn spawn_sweeper(cache: FileCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "starting cache sweeper");

        loop {
            tokio::time::sleep(interval).await;

            if let Err(e) = cache.sweep().await {
                tracing::warn!(error = %e, "cache sweep failed");
            }
        }
    })
}

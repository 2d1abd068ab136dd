//! cache_sweep tool implementation.
//!
//! Removes expired entries from the record store and the index.

use pagecache_core::FileCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the cache_sweep tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepOutput {
    /// Number of entries removed.
    pub removed: usize,
}

/// Implementation of the cache_sweep tool.
pub async fn sweep_impl(cache: &FileCache) -> Result<CallToolResult, McpError> {
    let removed = cache.sweep().await?;
    json_result(&CacheSweepOutput { removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::cache::{open_test_cache, parse_output};
    use pagecache_core::Metadata;

    #[tokio::test]
    async fn test_sweep_impl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_test_cache(dir.path()).await;
        cache.write("https://a.example", "a", &Metadata::new(), Some(1)).await.unwrap();
        cache.write("https://b.example", "b", &Metadata::new(), Some(0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let output: CacheSweepOutput = parse_output(&sweep_impl(&cache).await.unwrap());
        assert_eq!(output.removed, 1);

        let output: CacheSweepOutput = parse_output(&sweep_impl(&cache).await.unwrap());
        assert_eq!(output.removed, 0);
    }
}

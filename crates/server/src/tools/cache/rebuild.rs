//! cache_rebuild_index tool implementation.
//!
//! Reconstructs the index from the record files, e.g. after it was reset.

use pagecache_core::FileCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the cache_rebuild_index tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheRebuildOutput {
    /// Number of records now present in the index.
    pub indexed: usize,
}

/// Implementation of the cache_rebuild_index tool.
pub async fn rebuild_impl(cache: &FileCache) -> Result<CallToolResult, McpError> {
    let indexed = cache.rebuild_index().await?;
    json_result(&CacheRebuildOutput { indexed })
}

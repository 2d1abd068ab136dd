//! cache_stats tool implementation.

use pagecache_core::FileCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

/// Implementation of the cache_stats tool. Reports active and expired entry counts.
pub async fn stats_impl(cache: &FileCache) -> Result<CallToolResult, McpError> {
    let stats = cache.stats().await?;
    json_result(&stats)
}

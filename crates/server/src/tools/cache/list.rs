//! cache_list tool implementation.
//!
//! Enumerates indexed entries, newest first.

use pagecache_core::FileCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListEntry {
    pub key: String,
    pub identifier: String,
    pub created_at: String,
    pub expires_at: String,
    pub expired: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub entries: Vec<CacheListEntry>,
}

/// Implementation of the cache_list tool.
///
/// `expired` is judged against the cache's clock, the same one `cache_stats` uses.
pub async fn list_impl(cache: &FileCache) -> Result<CallToolResult, McpError> {
    let now = cache.now();
    let mut records = cache.list_all().await?;
    records.sort_by(|(_, a), (_, b)| b.created_at.cmp(&a.created_at));

    let entries = records
        .into_iter()
        .map(|(key, record)| CacheListEntry {
            key: key.to_string(),
            expired: record.is_expired_at(now),
            identifier: record.identifier,
            created_at: record.created_at.to_rfc3339(),
            expires_at: record.expires_at.to_rfc3339(),
        })
        .collect();

    json_result(&CacheListOutput { entries })
}

//! Cache-related MCP tools.
//!
//! This module provides tools for reading, populating and maintaining the
//! page cache.

pub mod get;
pub mod list;
pub mod put;
pub mod rebuild;
pub mod stats;
pub mod sweep;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
pub use put::{CachePutParams, put_impl};
pub use rebuild::rebuild_impl;
pub use stats::stats_impl;
pub use sweep::sweep_impl;

use pagecache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Decode the JSON text content produced by [`json_result`].
#[cfg(test)]
pub(crate) fn parse_output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}

#[cfg(test)]
pub(crate) async fn open_test_cache(dir: &std::path::Path) -> pagecache_core::FileCache {
    pagecache_core::FileCache::open(pagecache_core::CacheConfig::new(dir))
        .await
        .unwrap()
}

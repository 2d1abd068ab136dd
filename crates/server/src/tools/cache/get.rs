//! cache_get tool implementation.
//!
//! Looks up a fresh cached payload by request identifier.

use pagecache_core::{FileCache, Lookup, derive_key};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The request identifier (usually a URL) to look up.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// The cache key derived from the URL.
    pub key: String,
    /// Whether a fresh entry was found.
    pub hit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// ISO8601 timestamp of when the entry was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// ISO8601 timestamp after which the entry is stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Implementation of the cache_get tool.
///
/// A miss is a normal result with `hit: false`, not an error.
pub async fn get_impl(cache: &FileCache, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let key = derive_key(&params.url).to_string();
    let output = match cache.read::<Value>(&params.url).await? {
        Lookup::Hit(hit) => CacheGetOutput {
            key,
            hit: true,
            payload: Some(hit.payload),
            metadata: Some(Value::Object(hit.metadata)),
            created_at: Some(hit.created_at.to_rfc3339()),
            expires_at: Some(hit.expires_at.to_rfc3339()),
        },
        Lookup::Miss => {
            CacheGetOutput { key, hit: false, payload: None, metadata: None, created_at: None, expires_at: None }
        }
    };

    json_result(&output)
}

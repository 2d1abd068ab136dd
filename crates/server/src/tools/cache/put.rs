//! cache_put tool implementation.
//!
//! Stores a fetched payload so later lookups can skip the fetch.

use pagecache_core::cache::effective_ttl;
use pagecache_core::{Error, FileCache, Metadata};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;

/// Parameters for the cache_put tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePutParams {
    /// The request identifier (usually a URL) the payload was fetched for.
    pub url: String,

    /// The payload to cache, e.g. raw page markup as a string.
    pub payload: Value,

    /// Optional JSON object of auxiliary fields (fetch duration, status code, ...).
    #[serde(default)]
    pub metadata: Option<Value>,

    /// Hours until the entry expires (default: configured TTL, normally 24; at most 100 years).
    #[serde(default)]
    pub ttl_hours: Option<u32>,
}

/// Output from the cache_put tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePutOutput {
    /// The cache key the payload was stored under.
    pub key: String,
    /// The TTL applied, in hours, after clamping.
    pub ttl_hours: u32,
}

/// Implementation of the cache_put tool.
pub async fn put_impl(cache: &FileCache, params: CachePutParams) -> Result<CallToolResult, McpError> {
    let metadata = match params.metadata {
        None | Some(Value::Null) => Metadata::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(Error::InvalidInput("metadata must be a JSON object".into()).into()),
    };

    let ttl_hours = effective_ttl(params.ttl_hours.unwrap_or(cache.config().default_ttl_hours));
    let key = cache
        .write(&params.url, &params.payload, &metadata, Some(ttl_hours))
        .await?;

    json_result(&CachePutOutput { key: key.to_string(), ttl_hours })
}

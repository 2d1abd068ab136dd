//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::cache::{
    CacheGetParams, CachePutParams, get_impl, list_impl, put_impl, rebuild_impl, stats_impl, sweep_impl,
};

use pagecache_core::FileCache;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for pagecache.
#[derive(Clone)]
pub struct PageCacheServer {
    tool_router: ToolRouter<Self>,
    cache: FileCache,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PageCacheServer {
    /// Create a new server handler over an opened cache.
    pub fn new(cache: FileCache) -> Self {
        Self { tool_router: Self::tool_router(), cache }
    }

    #[tool(description = "Look up a cached page by URL. Returns hit=false when nothing fresh is cached.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.cache, params.0).await
    }

    #[tool(description = "Store a fetched payload for a URL with optional metadata and TTL in hours.")]
    async fn cache_put(&self, params: Parameters<CachePutParams>) -> Result<CallToolResult, McpError> {
        put_impl(&self.cache, params.0).await
    }

    #[tool(description = "Count active and expired cache entries.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.cache).await
    }

    #[tool(description = "Remove expired cache entries. Returns the number removed.")]
    async fn cache_sweep(&self) -> Result<CallToolResult, McpError> {
        sweep_impl(&self.cache).await
    }

    #[tool(description = "List indexed cache entries, newest first.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.cache).await
    }

    #[tool(description = "Rebuild the cache index from the stored records.")]
    async fn cache_rebuild_index(&self) -> Result<CallToolResult, McpError> {
        rebuild_impl(&self.cache).await
    }
}

impl ServerHandler for PageCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "pagecache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registers_cache_tools() {
        let dir = tempfile::tempdir().unwrap();
        let cache = crate::tools::cache::open_test_cache(dir.path()).await;
        let server = PageCacheServer::new(cache);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["cache_get", "cache_list", "cache_put", "cache_rebuild_index", "cache_stats", "cache_sweep"]
        );
    }
}

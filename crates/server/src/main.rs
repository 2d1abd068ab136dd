//! pagecache server entry point.
//!
//! Opens the page cache and boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use pagecache_core::{AppConfig, FileCache, cache::spawn_sweeper};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(cache_dir = %config.cache_dir.display(), "Starting pagecache server on stdio transport");

    let cache = FileCache::open(config.cache_config()).await?;
    let sweeper = config
        .sweep_interval()
        .map(|interval| spawn_sweeper(cache.clone(), interval));

    let handler = handler::PageCacheServer::new(cache);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    Ok(())
}

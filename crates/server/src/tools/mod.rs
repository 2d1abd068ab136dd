//! MCP tool implementations.
//!
//! This module contains all tools exposed by the pagecache server.

pub mod cache;

//! Core types and shared functionality for pagecache.
//!
//! This crate provides:
//! - File-backed result cache with a JSON index and expiry sweeping
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheConfig, CacheHit, CacheKey, CacheStats, FileCache, Lookup, Metadata, derive_key};
pub use config::{AppConfig, ConfigError};
pub use error::Error;

//! Unified error types for pagecache.
//!
//! A cache miss is deliberately absent here: absent, expired and corrupt
//! records all surface as [`Lookup::Miss`](crate::cache::Lookup::Miss).

use std::path::PathBuf;

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the page cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty identifier from a tool call).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid cache key format.
    #[error("CACHE_ERROR: invalid hash format")]
    InvalidHash,

    /// The storage directory or one of its files cannot be read or written.
    #[error("STORE_UNAVAILABLE: {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index document failed to parse.
    ///
    /// Recovered inside the cache by resetting the index; callers never see it
    /// from the public cache operations.
    #[error("INDEX_CORRUPT: {0}")]
    IndexCorrupt(String),

    /// A payload or metadata value could not be serialized.
    #[error("ENCODE_FAILED: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StoreUnavailable { path: path.into(), source }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidHash => (-32602, "Invalid hash format".to_string()),
            Error::StoreUnavailable { .. } => (-32002, err.to_string()),
            Error::IndexCorrupt(msg) => (-32003, msg.clone()),
            Error::Encode(e) => (-32000, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::store("/tmp/cache", std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(err.to_string().contains("STORE_UNAVAILABLE"));
        assert!(err.to_string().contains("/tmp/cache"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InvalidInput("metadata must be a JSON object".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_store_unavailable_code() {
        let err = Error::store("/tmp/cache", std::io::Error::from(std::io::ErrorKind::StorageFull));
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32002);
    }
}

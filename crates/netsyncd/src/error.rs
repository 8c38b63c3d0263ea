//! Error types for netsyncd

use netsync_collect::CollectError;
use netsync_core::SyncError;
use thiserror::Error;

/// Result type alias for netsyncd operations
pub type Result<T> = std::result::Result<T, NetsyncError>;

/// Errors raised by the netsync command layer
#[derive(Debug, Error)]
pub enum NetsyncError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot, diff or apply error
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Live collection error
    #[error(transparent)]
    Collect(#[from] CollectError),
}

impl NetsyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = NetsyncError::config("max_workers must be > 0");
        assert_eq!(err.to_string(), "Configuration error: max_workers must be > 0");

        let err = NetsyncError::from(SyncError::not_found("device", "edge-01"));
        assert_eq!(err.to_string(), "Not found: device 'edge-01'");
    }
}

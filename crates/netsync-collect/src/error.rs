//! Error types for live collection.

use std::io;
use std::path::PathBuf;

use netsync_core::SyncError;
use thiserror::Error;

/// Result type alias for collection operations.
pub type CollectResult<T> = Result<T, CollectError>;

/// Errors that can occur while collecting from devices.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The device could not be reached.
    #[error("Device '{device}' unreachable: {reason}")]
    Unreachable { device: String, reason: String },

    /// Collection did not finish within the per-device budget.
    #[error("Device '{device}' timed out after {secs}s")]
    Timeout { device: String, secs: u64 },

    /// Facts returned by a collector could not be interpreted.
    #[error("Invalid facts from '{device}': {reason}")]
    InvalidFacts { device: String, reason: String },

    /// Reading an inventory or facts file failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Decoding an inventory or facts document failed.
    #[error("Failed to decode '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A collection task panicked or was cancelled.
    #[error("Collection task failed: {0}")]
    Task(String),

    /// Snapshot store rejected the collected data.
    #[error(transparent)]
    Store(#[from] SyncError),
}

impl CollectError {
    pub fn unreachable(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            device: device.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_facts(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFacts {
            device: device.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error only affects one device's contribution.
    pub fn is_device_local(&self) -> bool {
        matches!(
            self,
            CollectError::Unreachable { .. }
                | CollectError::Timeout { .. }
                | CollectError::InvalidFacts { .. }
                | CollectError::Task(_)
        )
    }
}

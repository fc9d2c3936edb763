//! Error types for the sync layer.

use crate::cloud::TransferError;
use crate::state::SyncDirection;
use fleetsync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// Cloneable so that every caller coalesced onto one run receives the same
/// failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The remote store could not be reached or refused the request.
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Local persistence failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The remote snapshot does not have the consolidated shape.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Another sync is in flight and the policy rejects concurrent requests.
    #[error("{active} sync already in progress")]
    ConcurrentSync { active: SyncDirection },

    /// The task running the sync ended without a result.
    #[error("sync task aborted: {0}")]
    Aborted(String),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

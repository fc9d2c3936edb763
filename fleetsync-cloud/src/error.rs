//! S3 transport error types.

use fleetsync_sync::TransferError;
use thiserror::Error;

/// Result type for S3 operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur talking to an S3-compatible store.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("S3 operation failed: {0}")]
    S3(String),

    #[error("S3 endpoint unreachable: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<CloudError> for TransferError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::NotFound(key) => TransferError::NotFound(key),
            CloudError::AuthFailed(msg) => TransferError::Auth(msg),
            CloudError::Network(msg) => TransferError::Network(msg),
            CloudError::Serialization(e) => TransferError::InvalidPayload(e.to_string()),
            other @ (CloudError::S3(_) | CloudError::Config(_)) => {
                TransferError::Storage(other.to_string())
            }
        }
    }
}

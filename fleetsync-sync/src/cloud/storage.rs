//! Remote blob store abstraction.
//!
//! The sync engine only ever needs two calls: upload a JSON document under
//! a key and download it again. Each call is a single attempt; retries and
//! timeouts belong to the caller or the adapter's client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors reported by a [`BlobTransfer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// No object is stored under the key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The backing store failed (disk, bucket, ...).
    #[error("storage error: {0}")]
    Storage(String),

    /// The stored object is not valid JSON.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The payload exceeds the adapter's size limit.
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },
}

impl TransferError {
    /// True if the error means "nothing stored here" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransferError::NotFound(_))
    }
}

/// Configuration shared by the file-oriented adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudStorageConfig {
    /// Folder (or key prefix) under which sync objects are stored.
    pub sync_folder: String,
    /// Maximum payload size in bytes; 0 disables the check.
    pub max_payload_bytes: u64,
}

impl Default for CloudStorageConfig {
    fn default() -> Self {
        Self {
            sync_folder: "FleetSync".to_string(),
            max_payload_bytes: 50 * 1024 * 1024, // 50 MB
        }
    }
}

/// Upload/download of JSON documents by key.
#[async_trait]
pub trait BlobTransfer: Send + Sync {
    /// Returns the name of the remote store, for logs.
    fn provider_name(&self) -> &'static str;

    /// Stores `payload` under `key`, replacing any previous object.
    async fn upload_blob(&self, key: &str, payload: &Value) -> TransferResult<()>;

    /// Fetches the object stored under `key`.
    ///
    /// A missing object is reported as [`TransferError::NotFound`].
    async fn download_blob(&self, key: &str) -> TransferResult<Value>;
}

/// Serializes a payload and enforces the size limit.
pub fn encode_payload(payload: &Value, max_bytes: u64) -> TransferResult<Vec<u8>> {
    let bytes = serde_json::to_vec(payload)
        .map_err(|e| TransferError::InvalidPayload(format!("failed to encode payload: {e}")))?;
    check_size(bytes.len() as u64, max_bytes)?;
    Ok(bytes)
}

/// Parses a downloaded object and enforces the size limit.
pub fn decode_payload(bytes: &[u8], max_bytes: u64) -> TransferResult<Value> {
    check_size(bytes.len() as u64, max_bytes)?;
    serde_json::from_slice(bytes)
        .map_err(|e| TransferError::InvalidPayload(format!("object is not valid JSON: {e}")))
}

fn check_size(size: u64, limit: u64) -> TransferResult<()> {
    if limit > 0 && size > limit {
        return Err(TransferError::PayloadTooLarge { size, limit });
    }
    Ok(())
}

/// Rejects keys that are empty or could escape the sync folder.
pub fn validate_key(key: &str) -> TransferResult<()> {
    let escapes = key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if key.is_empty() || escapes {
        return Err(TransferError::Storage(format!("invalid object key: {key:?}")));
    }
    Ok(())
}

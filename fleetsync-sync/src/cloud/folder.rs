//! Synced-folder storage implementation.
//!
//! Writes sync objects as plain files into a folder that some other
//! program replicates (iCloud Drive, Dropbox, a network share). Writes go
//! to a temporary file first and are renamed into place, so a reader never
//! sees a half-written snapshot.

use super::storage::{
    decode_payload, encode_payload, validate_key, BlobTransfer, CloudStorageConfig,
    TransferError, TransferResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

/// Folder transport configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderTransferConfig {
    /// The replicated folder (e.g. the iCloud Drive container).
    pub root: PathBuf,
    /// Base cloud storage config.
    #[serde(flatten)]
    pub base: CloudStorageConfig,
}

impl FolderTransferConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base: CloudStorageConfig::default(),
        }
    }
}

/// Folder-backed transport.
pub struct FolderTransfer {
    config: FolderTransferConfig,
}

impl FolderTransfer {
    /// Creates a new folder transport. The folder is created on first upload.
    pub fn new(config: FolderTransferConfig) -> Self {
        Self { config }
    }

    /// The directory objects are stored in.
    pub fn sync_folder(&self) -> PathBuf {
        self.config.root.join(&self.config.base.sync_folder)
    }

    fn object_path(&self, key: &str) -> TransferResult<PathBuf> {
        validate_key(key)?;
        Ok(self.sync_folder().join(key))
    }
}

fn io_error(action: &str, e: std::io::Error) -> TransferError {
    match e.kind() {
        ErrorKind::PermissionDenied => TransferError::Auth(format!("failed to {action}: {e}")),
        _ => TransferError::Storage(format!("failed to {action}: {e}")),
    }
}

#[async_trait]
impl BlobTransfer for FolderTransfer {
    fn provider_name(&self) -> &'static str {
        "Synced Folder"
    }

    async fn upload_blob(&self, key: &str, payload: &Value) -> TransferResult<()> {
        let path = self.object_path(key)?;
        let bytes = encode_payload(payload, self.config.base.max_payload_bytes)?;

        let parent = path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.sync_folder());
        if !parent.exists() {
            fs::create_dir_all(&parent)
                .await
                .map_err(|e| io_error("create sync folder", e))?;
            info!("Created sync folder: {:?}", parent);
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        debug!("Writing {:?} ({} bytes)", path, bytes.len());
        fs::write(&temp, &bytes)
            .await
            .map_err(|e| io_error("write temporary file", e))?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_error("move file into place", e));
        }
        Ok(())
    }

    async fn download_blob(&self, key: &str) -> TransferResult<Value> {
        let path = self.object_path(key)?;
        debug!("Reading {:?}", path);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TransferError::NotFound(key.to_string()));
            }
            Err(e) => return Err(io_error("read file", e)),
        };
        decode_payload(&bytes, self.config.base.max_payload_bytes)
    }
}

//! HTTP object endpoint implementation.
//!
//! Objects live at `{base_url}/{key}`: `PUT` stores one, `GET` fetches it.
//! This matches pre-signed bucket URLs, WebDAV shares and the small
//! self-hosted sync servers fleet operators run.

use super::storage::{
    decode_payload, encode_payload, validate_key, BlobTransfer, TransferError, TransferResult,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP transport configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransferConfig {
    /// Base URL objects are stored under (e.g. `https://sync.example.com/fleet`).
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub bearer_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum payload size in bytes; 0 disables the check.
    pub max_payload_bytes: u64,
}

impl Default for HttpTransferConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bearer_token: None,
            timeout_secs: 60,
            max_payload_bytes: 50 * 1024 * 1024, // 50 MB
        }
    }
}

/// HTTP-backed transport.
pub struct HttpTransfer {
    config: HttpTransferConfig,
    client: Client,
}

impl HttpTransfer {
    /// Creates a new HTTP transport.
    pub fn new(config: HttpTransferConfig) -> TransferResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransferError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn object_url(&self, key: &str) -> TransferResult<String> {
        validate_key(key)?;
        Ok(format!("{}/{}", self.config.base_url.trim_end_matches('/'), key))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Maps a non-success status to the transfer error it stands for.
fn status_error(status: StatusCode, key: &str, body: String) -> TransferError {
    match status {
        StatusCode::NOT_FOUND => TransferError::NotFound(key.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TransferError::Auth(format!("{status}: {body}"))
        }
        _ => TransferError::Network(format!("{status}: {body}")),
    }
}

#[async_trait]
impl BlobTransfer for HttpTransfer {
    fn provider_name(&self) -> &'static str {
        "HTTP"
    }

    async fn upload_blob(&self, key: &str, payload: &Value) -> TransferResult<()> {
        let url = self.object_url(key)?;
        let body = encode_payload(payload, self.config.max_payload_bytes)?;

        debug!("Uploading {} ({} bytes)", url, body.len());
        let response = self
            .authorize(self.client.put(&url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransferError::Network(format!("upload failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(status_error(status, key, error));
        }
        Ok(())
    }

    async fn download_blob(&self, key: &str) -> TransferResult<Value> {
        let url = self.object_url(key)?;

        debug!("Downloading {}", url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| TransferError::Network(format!("download failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(status_error(status, key, error));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransferError::Network(format!("read download body failed: {e}")))?;
        decode_payload(&bytes, self.config.max_payload_bytes)
    }
}

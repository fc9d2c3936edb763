//! S3 transport implementation.
//!
//! Objects are stored as `{bucket}/{sync_folder}/{key}`. Credentials are
//! either given explicitly (self-hosted MinIO and friends) or resolved
//! through the default AWS provider chain (environment, profile, IMDS).

use crate::error::{CloudError, CloudResult};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use fleetsync_sync::cloud::{decode_payload, encode_payload, validate_key, CloudStorageConfig};
use fleetsync_sync::{BlobTransfer, TransferResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

/// S3 transport configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3TransferConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores. `None` uses AWS.
    pub endpoint_url: Option<String>,
    /// Address the bucket in the path instead of the host name.
    pub force_path_style: bool,
    /// Static credentials; both or neither must be set.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Key prefix and size limit.
    #[serde(flatten)]
    pub base: CloudStorageConfig,
}

impl Default for S3TransferConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
            base: CloudStorageConfig::default(),
        }
    }
}

impl fmt::Debug for S3TransferConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3TransferConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("base", &self.base)
            .finish()
    }
}

impl S3TransferConfig {
    /// Checks the settings that cannot be defaulted.
    pub fn validate(&self) -> CloudResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(CloudError::Config("bucket must be set".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(CloudError::Config("region must be set".to_string()));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(CloudError::Config(
                "access_key_id and secret_access_key must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Full object key for a sync key, below the sync folder.
    pub fn object_key(&self, key: &str) -> TransferResult<String> {
        validate_key(key)?;
        let prefix = self.base.sync_folder.trim_matches('/');
        if prefix.is_empty() {
            Ok(key.to_string())
        } else {
            Ok(format!("{prefix}/{key}"))
        }
    }
}

/// S3-backed transport.
pub struct S3Transfer {
    client: Client,
    config: S3TransferConfig,
}

impl S3Transfer {
    /// Builds the client. Requests are sent once, without SDK retries.
    pub async fn connect(config: S3TransferConfig) -> CloudResult<Self> {
        config.validate()?;

        let s3_config = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials =
                    Credentials::new(access_key, secret_key, None, None, "fleetsync-static");
                aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .credentials_provider(credentials)
            }
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };
        let mut s3_config = s3_config
            .force_path_style(config.force_path_style)
            .retry_config(RetryConfig::disabled());
        if let Some(url) = &config.endpoint_url {
            s3_config = s3_config.endpoint_url(url);
        }

        info!(
            "S3 transport ready: bucket {} in {} ({})",
            config.bucket,
            config.region,
            config.endpoint_url.as_deref().unwrap_or("AWS")
        );
        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            config,
        })
    }

    pub fn config(&self) -> &S3TransferConfig {
        &self.config
    }
}

/// Maps an SDK failure onto the transport error it stands for.
fn sdk_error<E>(err: SdkError<E>, key: &str) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    match (&err, code.as_deref(), status) {
        (_, Some("NoSuchKey" | "NotFound"), _) | (_, _, Some(404)) => {
            CloudError::NotFound(key.to_string())
        }
        (
            _,
            Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken"),
            _,
        )
        | (_, _, Some(401 | 403)) => CloudError::AuthFailed(message),
        (SdkError::DispatchFailure(_) | SdkError::TimeoutError(_), _, _) => {
            CloudError::Network(message)
        }
        (_, _, Some(500..=599)) => CloudError::Network(message),
        _ => CloudError::S3(message),
    }
}

#[async_trait]
impl BlobTransfer for S3Transfer {
    fn provider_name(&self) -> &'static str {
        "S3"
    }

    async fn upload_blob(&self, key: &str, payload: &Value) -> TransferResult<()> {
        let object_key = self.config.object_key(key)?;
        let body = encode_payload(payload, self.config.base.max_payload_bytes)?;

        debug!("Uploading s3://{}/{} ({} bytes)", self.config.bucket, object_key, body.len());
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error(e, key))?;
        Ok(())
    }

    async fn download_blob(&self, key: &str) -> TransferResult<Value> {
        let object_key = self.config.object_key(key)?;

        debug!("Downloading s3://{}/{}", self.config.bucket, object_key);
        let output = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| sdk_error(e, key))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| CloudError::Network(format!("failed to read object body: {e}")))?
            .into_bytes();
        decode_payload(&bytes, self.config.base.max_payload_bytes)
    }
}

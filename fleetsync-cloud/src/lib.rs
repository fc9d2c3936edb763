//! S3 object storage transport for FleetSync.
//!
//! Stores the consolidated snapshot (and the legacy per-collection objects)
//! in an S3 bucket, or any store that speaks the S3 API (MinIO, R2,
//! Wasabi). Plugs into the orchestrator through
//! [`fleetsync_sync::BlobTransfer`].

mod error;
mod s3;

pub use error::{CloudError, CloudResult};
pub use s3::{S3Transfer, S3TransferConfig};

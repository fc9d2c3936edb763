//! Remote store transports for sync.
//!
//! Every transport implements [`BlobTransfer`]: upload a JSON document under
//! a key, download it again.
//!
//! - [`MemoryTransfer`] keeps blobs in memory (tests, demos)
//! - [`FolderTransfer`] writes into a folder kept in sync by a desktop
//!   client (Dropbox, iCloud Drive, a network share)
//! - [`HttpTransfer`] talks to a plain PUT/GET object endpoint

pub mod folder;
pub mod http;
pub mod memory;
pub mod storage;

pub use folder::{FolderTransfer, FolderTransferConfig};
pub use http::{HttpTransfer, HttpTransferConfig};
pub use memory::MemoryTransfer;
pub use storage::{
    decode_payload, encode_payload, validate_key, BlobTransfer, CloudStorageConfig,
    TransferError, TransferResult,
};

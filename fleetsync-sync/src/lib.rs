//! Sync engine for FleetSync.
//!
//! Keeps the local record store and one consolidated snapshot in a remote
//! object store in agreement.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Change Detector** ([`ChangeDetector`]): fingerprints snapshots so
//!   no-op syncs are skipped without a network call
//! - **Merge Engine** ([`MergeEngine`]): reconciles one collection, applying
//!   newest-wins and tombstone rules
//! - **Engine** ([`SyncEngine`]): builds snapshots and merges them into the
//!   store, without I/O
//! - **Orchestrator** ([`SyncOrchestrator`]): runs uploads and downloads
//!   through a single gate, tracks the [`SyncSession`]
//! - **Transports** ([`cloud`]): the [`BlobTransfer`] boundary and its
//!   in-memory, folder and HTTP implementations
//!
//! ## Sync Process
//!
//! 1. **Fetch**: download the consolidated snapshot (or the legacy
//!    per-collection objects, or nothing on first run)
//! 2. **Merge**: fold remote tombstones in, merge every collection
//! 3. **Write**: store changed collections and the tombstone ledger
//! 4. **Upload**: snapshot the store and send it unless its fingerprint
//!    matches the last upload
//!
//! # Example
//!
//! ```
//! use fleetsync_storage::RecordStore;
//! use fleetsync_sync::cloud::MemoryTransfer;
//! use fleetsync_sync::{SyncConfig, SyncOrchestrator};
//! use std::sync::Arc;
//! use tokio::sync::RwLock;
//!
//! let store = Arc::new(RwLock::new(RecordStore::in_memory()));
//! let config = SyncConfig {
//!     device_name: "Dispatch Laptop".to_string(),
//!     ..Default::default()
//! };
//!
//! let orchestrator = SyncOrchestrator::new(config, store, Arc::new(MemoryTransfer::new()));
//! ```

mod auto;
pub mod cloud;
mod config;
mod engine;
mod error;
pub mod fingerprint;
pub mod merge;
mod orchestrator;
mod report;
pub mod state;

pub use auto::AutoSyncHandle;
pub use cloud::{BlobTransfer, TransferError, TransferResult};
pub use config::{ConcurrencyPolicy, SyncConfig, MAX_TOMBSTONE_RETENTION_DAYS};
pub use engine::{SnapshotMerge, SyncEngine, WriteBack};
pub use error::{SyncError, SyncResult};
pub use fingerprint::{canonical_json, ChangeDetector, Fingerprint, FingerprintAlgorithm};
pub use merge::{CollectionMerge, MergeEngine, MergeStats};
pub use orchestrator::SyncOrchestrator;
pub use report::{DownloadOutcome, RemoteSource, SyncReport, UploadOutcome};
pub use state::{SyncDirection, SyncPhase, SyncSession, SyncTrigger};

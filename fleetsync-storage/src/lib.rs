//! Local storage layer for FleetSync.
//!
//! Holds the authoritative local copy of every fleet collection and the
//! tombstone ledger, written through to a key-value backend on every
//! mutation.
//!
//! # Architecture
//!
//! - [`KeyValueStore`] is the persistence boundary (get/set by named key)
//! - [`MemoryKv`] keeps everything in process memory
//! - [`SqliteKv`] stores entries in a single SQLite table
//! - [`RecordStore`] owns the collections and mediates every save/delete

mod error;
mod kv;
mod record_store;

pub use error::{StorageError, StorageResult};
pub use kv::{KeyValueStore, MemoryKv, SqliteKv};
pub use record_store::{RecordStore, DEFAULT_NAMESPACE};

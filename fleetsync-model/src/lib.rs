//! Record model for FleetSync.
//!
//! Defines the types every layer of the sync engine agrees on:
//! - [`Entity`]: an opaque domain record (id, timestamps, JSON fields)
//! - [`CollectionSchema`] / [`MergeStrategy`]: how a collection is reconciled
//! - [`Tombstone`] / [`TombstoneLedger`]: deletions that must survive merges
//! - [`ConsolidatedSnapshot`]: the single payload exchanged with the remote store
//!
//! Vehicles, drivers, freights and the other fleet records are not modelled
//! field by field; the engine only needs their identity and timestamps.

mod entity;
mod schema;
mod snapshot;
mod tombstone;

pub use entity::{Entity, MalformedRecord, RESERVED_FIELDS};
pub use schema::{collections, CollectionSchema, MergeStrategy, SchemaRegistry, Side};
pub use snapshot::{ConsolidatedSnapshot, SnapshotContent, SNAPSHOT_VERSION};
pub use tombstone::{Tombstone, TombstoneLedger};

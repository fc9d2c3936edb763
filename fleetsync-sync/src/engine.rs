//! Snapshot building and merging, without I/O.
//!
//! The engine turns a [`RecordStore`] into a consolidated snapshot and
//! merges a remote snapshot back into it. The orchestrator handles all I/O
//! (transfers, locking, session bookkeeping).

use crate::config::SyncConfig;
use crate::fingerprint::{ChangeDetector, Fingerprint};
use crate::merge::{CollectionMerge, MergeEngine};
use fleetsync_model::{ConsolidatedSnapshot, SchemaRegistry, TombstoneLedger};
use fleetsync_storage::{RecordStore, StorageResult};
use fleetsync_types::Timestamp;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Result of merging a remote snapshot, not yet written back.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMerge {
    pub collections: Vec<CollectionMerge>,
    /// Local ledger with the remote tombstones folded in.
    pub tombstones: TombstoneLedger,
    /// Remote tombstones that were new or newer than the local ones.
    pub tombstones_added: usize,
    /// Remote tombstones that could not be read.
    pub tombstones_skipped: usize,
}

/// What the write-back changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteBack {
    pub collections_written: usize,
    pub tombstones_pruned: usize,
}

/// Stateless sync logic shared by every run.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    detector: ChangeDetector,
    merger: MergeEngine,
    registry: SchemaRegistry,
    snapshot_version: String,
    retention_days: Option<u32>,
}

impl SyncEngine {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            detector: ChangeDetector::new(config.fingerprint),
            merger: MergeEngine::new().with_tie_override(config.tie_override()),
            registry: config.schema_registry(),
            snapshot_version: config.snapshot_version.clone(),
            retention_days: config.tombstone_retention_days,
        }
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Builds the consolidated snapshot of everything in the store.
    ///
    /// Collections that never held a record are left out, so an empty
    /// device never overwrites a collection it knows nothing about.
    pub fn build_snapshot(&self, store: &RecordStore) -> ConsolidatedSnapshot {
        let collections: Vec<_> = store
            .collection_names()
            .into_iter()
            .map(|name| {
                let records = store.get_all(&name);
                (name, records)
            })
            .collect();
        ConsolidatedSnapshot::from_parts(
            collections
                .iter()
                .map(|(name, records)| (name.as_str(), records.as_slice())),
            store.tombstones(),
            Timestamp::now(),
            self.snapshot_version.clone(),
        )
    }

    /// Fingerprint of the store's current data.
    pub fn local_fingerprint(&self, store: &RecordStore) -> Fingerprint {
        self.detector.fingerprint(&self.build_snapshot(store))
    }

    /// Merges `remote` against the store's current contents.
    pub fn merge_snapshot(&self, store: &RecordStore, remote: &ConsolidatedSnapshot) -> SnapshotMerge {
        let mut tombstones = store.tombstones().clone();
        let (remote_tombstones, rejected) = remote.tombstone_ledger();
        for e in &rejected {
            warn!("Skipping malformed remote tombstone: {}", e);
        }
        let tombstones_added = tombstones.merge(&remote_tombstones);

        let names: BTreeSet<String> = store
            .collection_names()
            .into_iter()
            .chain(remote.collection_names().map(str::to_string))
            .collect();

        let collections = names
            .iter()
            .map(|name| {
                let schema = self.registry.get(name);
                if !self.registry.is_registered(name) {
                    debug!("Collection {} has no schema, merging newest-wins", name);
                }
                let local = store.get_all(name);
                let merged =
                    self.merger
                        .merge_collection(&schema, &local, remote.collection(name), &tombstones);
                let s = &merged.stats;
                info!(
                    "Merged {}: {} kept, {} updated, {} added, {} deleted, {} skipped",
                    name,
                    s.kept_local,
                    s.took_remote,
                    s.added_remote,
                    s.dropped_by_tombstone,
                    s.skipped_malformed
                );
                merged
            })
            .collect();

        SnapshotMerge {
            collections,
            tombstones,
            tombstones_added,
            tombstones_skipped: rejected.len(),
        }
    }

    /// Writes a merge result into the store, pruning expired tombstones
    /// when retention is configured.
    ///
    /// Pruning is settled before the first write, so a failure leaves the
    /// store as it was.
    pub fn apply(&self, store: &mut RecordStore, merge: SnapshotMerge) -> StorageResult<WriteBack> {
        let mut write_back = WriteBack::default();

        let mut tombstones = merge.tombstones;
        if let Some(days) = self.retention_days {
            match retention_cutoff(days) {
                Some(cutoff) => {
                    write_back.tombstones_pruned = tombstones.prune_before(cutoff);
                    if write_back.tombstones_pruned > 0 {
                        info!(
                            "Pruned {} tombstones older than {} days",
                            write_back.tombstones_pruned, days
                        );
                    }
                }
                None => debug!(
                    "Retention of {} days reaches past the earliest instant, nothing to prune",
                    days
                ),
            }
        }

        for collection in merge.collections {
            if collection.stats.changed {
                store.replace_collection(&collection.collection, collection.records)?;
                write_back.collections_written += 1;
            }
        }
        if &tombstones != store.tombstones() {
            store.replace_tombstones(tombstones)?;
        }
        Ok(write_back)
    }
}

/// Oldest instant a tombstone may carry and still be kept, or `None` when
/// the window covers every representable timestamp.
fn retention_cutoff(days: u32) -> Option<Timestamp> {
    let window = i64::from(days).checked_mul(MILLIS_PER_DAY)?;
    Timestamp::now().plus_millis(-window)
}

//! Per-collection reconciliation of a local and a remote copy.
//!
//! Rules for [`MergeStrategy::PerRecordNewestWins`]:
//! - an id on both sides keeps the copy with the greater `updatedAt`; ties
//!   go to the collection's priority side
//! - a tombstone whose `deletedAt` is not older than the winning copy
//!   removes the id
//! - a copy newer than its tombstone survives only if it exists locally, so
//!   a remote replica cannot resurrect a record deleted here
//! - ids present on one side only are kept
//!
//! [`MergeStrategy::RemoteOverwrite`] replaces the local collection with the
//! remote one when the remote carries it.

use fleetsync_model::{CollectionSchema, Entity, MergeStrategy, Side, TombstoneLedger};
use fleetsync_types::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// What a collection merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Records whose local copy survived.
    pub kept_local: usize,
    /// Records where the remote copy replaced a different local one.
    pub took_remote: usize,
    /// Records that only the remote had.
    pub added_remote: usize,
    /// Records removed or kept out by a tombstone.
    pub dropped_by_tombstone: usize,
    /// Remote records that could not be read.
    pub skipped_malformed: usize,
    /// Whether the result differs from the local collection.
    pub changed: bool,
}

/// The merged contents of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMerge {
    pub collection: String,
    /// Survivors, ordered by id.
    pub records: Vec<Entity>,
    pub stats: MergeStats,
}

/// Applies the merge rules of each collection's schema.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    tie_override: Option<Side>,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every collection resolve ties toward `side`, whatever its
    /// schema says.
    #[must_use]
    pub fn with_tie_override(mut self, side: Option<Side>) -> Self {
        self.tie_override = side;
        self
    }

    /// Merges one collection.
    ///
    /// `remote` is `None` when the remote snapshot does not carry the
    /// collection at all. `tombstones` must already contain the remote
    /// tombstones.
    pub fn merge_collection(
        &self,
        schema: &CollectionSchema,
        local: &[Entity],
        remote: Option<&[Value]>,
        tombstones: &TombstoneLedger,
    ) -> CollectionMerge {
        let mut stats = MergeStats::default();
        let local_index: BTreeMap<&RecordId, &Entity> = local.iter().map(|e| (&e.id, e)).collect();
        let remote_index = remote
            .map(|raw| index_remote(schema, raw, &mut stats))
            .unwrap_or_default();

        let records = match (schema.merge_strategy, remote) {
            (MergeStrategy::RemoteOverwrite, Some(_)) => {
                stats.took_remote = remote_index.len();
                remote_index.into_values().collect()
            }
            (MergeStrategy::RemoteOverwrite, None) => {
                stats.kept_local = local.len();
                local_index.values().map(|e| (*e).clone()).collect()
            }
            (MergeStrategy::PerRecordNewestWins, _) => {
                let priority = self.tie_override.unwrap_or(schema.tie_priority);
                merge_newest_wins(&schema.name, &local_index, remote_index, tombstones, priority, &mut stats)
            }
        };

        stats.changed = records.len() != local_index.len()
            || records.iter().any(|r| local_index.get(&r.id) != Some(&r));

        CollectionMerge {
            collection: schema.name.clone(),
            records,
            stats,
        }
    }
}

/// Reads remote records, skipping malformed ones and keeping the newest copy
/// of duplicated ids.
fn index_remote(
    schema: &CollectionSchema,
    raw: &[Value],
    stats: &mut MergeStats,
) -> BTreeMap<RecordId, Entity> {
    let mut index = BTreeMap::new();
    for value in raw {
        let entity = match Entity::from_json(value.clone())
            .and_then(|e| e.ensure_fields(&schema.required_fields).map(|()| e))
        {
            Ok(entity) => entity,
            Err(e) => {
                warn!("Skipping malformed remote record in {}: {}", schema.name, e);
                stats.skipped_malformed += 1;
                continue;
            }
        };
        match index.get(&entity.id) {
            Some(existing) if !is_newer(&entity, existing) => {}
            _ => {
                index.insert(entity.id.clone(), entity);
            }
        }
    }
    index
}

fn is_newer(candidate: &Entity, than: &Entity) -> bool {
    candidate.updated_at > than.updated_at
}

fn merge_newest_wins(
    collection: &str,
    local: &BTreeMap<&RecordId, &Entity>,
    mut remote: BTreeMap<RecordId, Entity>,
    tombstones: &TombstoneLedger,
    priority: Side,
    stats: &mut MergeStats,
) -> Vec<Entity> {
    let ids: BTreeSet<RecordId> = local
        .keys()
        .map(|id| (*id).clone())
        .chain(remote.keys().cloned())
        .collect();

    let mut merged = Vec::with_capacity(ids.len());
    for id in ids {
        let local_copy = local.get(&id).copied();
        let remote_copy = remote.remove(&id);

        let (winner, side) = match (local_copy, remote_copy) {
            (Some(l), Some(r)) => {
                let remote_wins = is_newer(&r, l) || (r.updated_at == l.updated_at && priority == Side::Remote);
                if remote_wins { (r, Side::Remote) } else { (l.clone(), Side::Local) }
            }
            (Some(l), None) => (l.clone(), Side::Local),
            (None, Some(r)) => (r, Side::Remote),
            (None, None) => continue,
        };

        if let Some(tombstone) = tombstones.get(collection, &id)
            && (tombstone.deleted_at >= winner.updated_at || local_copy.is_none())
        {
            stats.dropped_by_tombstone += 1;
            continue;
        }

        match (side, local_copy) {
            (Side::Local, _) => stats.kept_local += 1,
            (Side::Remote, Some(l)) if *l == winner => stats.kept_local += 1,
            (Side::Remote, Some(_)) => stats.took_remote += 1,
            (Side::Remote, None) => stats.added_remote += 1,
        }
        merged.push(winner);
    }
    merged
}

//! Deletion markers.
//!
//! A tombstone records that a record id was intentionally removed so that a
//! remote snapshot still containing the record cannot bring it back.

use crate::entity::MalformedRecord;
use fleetsync_types::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A deleted record id.
///
/// On the wire the collection is implied by the map key the tombstone is
/// stored under, so it is not serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub id: RecordId,
    #[serde(rename = "deletedAt")]
    pub deleted_at: Timestamp,
    #[serde(skip)]
    pub collection: String,
}

impl Tombstone {
    pub fn new(collection: impl Into<String>, id: RecordId, deleted_at: Timestamp) -> Self {
        Self {
            id,
            deleted_at,
            collection: collection.into(),
        }
    }

    /// Reads a wire tombstone stored under `collection`.
    pub fn from_json(collection: &str, value: &Value) -> Result<Self, MalformedRecord> {
        let object = value.as_object().ok_or(MalformedRecord::NotAnObject)?;
        let id = object
            .get("id")
            .and_then(RecordId::from_json)
            .ok_or(MalformedRecord::MissingId)?;
        let deleted_at = object
            .get("deletedAt")
            .and_then(Timestamp::from_json)
            .ok_or_else(|| MalformedRecord::MissingField {
                id: id.to_string(),
                field: "deletedAt".to_string(),
            })?;
        Ok(Self::new(collection, id, deleted_at))
    }
}

/// Per-collection tombstones, at most one per id.
///
/// When two tombstones exist for the same id the newest `deletedAt` is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TombstoneLedger {
    entries: BTreeMap<String, BTreeMap<RecordId, Tombstone>>,
}

impl TombstoneLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a deletion. Returns the tombstone now stored for the id.
    pub fn record(&mut self, collection: &str, id: RecordId, deleted_at: Timestamp) -> Tombstone {
        let tombstone = Tombstone::new(collection, id, deleted_at);
        self.absorb(tombstone.clone());
        self.get(collection, &tombstone.id)
            .cloned()
            .unwrap_or(tombstone)
    }

    /// Folds one tombstone in. Returns true if the ledger changed.
    pub fn absorb(&mut self, tombstone: Tombstone) -> bool {
        let slot = self.entries.entry(tombstone.collection.clone()).or_default();
        match slot.get(&tombstone.id) {
            Some(existing) if existing.deleted_at >= tombstone.deleted_at => false,
            _ => {
                slot.insert(tombstone.id.clone(), tombstone);
                true
            }
        }
    }

    /// Union with another ledger. Returns how many entries changed.
    pub fn merge(&mut self, other: &TombstoneLedger) -> usize {
        other
            .iter()
            .filter(|t| self.absorb((*t).clone()))
            .count()
    }

    pub fn get(&self, collection: &str, id: &RecordId) -> Option<&Tombstone> {
        self.entries.get(collection).and_then(|c| c.get(id))
    }

    pub fn contains(&self, collection: &str, id: &RecordId) -> bool {
        self.get(collection, id).is_some()
    }

    /// Tombstones of one collection, ordered by id.
    pub fn for_collection(&self, collection: &str) -> Vec<&Tombstone> {
        self.entries
            .get(collection)
            .map(|c| c.values().collect())
            .unwrap_or_default()
    }

    /// All tombstones, ordered by collection then id.
    pub fn iter(&self) -> impl Iterator<Item = &Tombstone> {
        self.entries.values().flat_map(|c| c.values())
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops tombstones deleted before `cutoff`. Returns how many were dropped.
    pub fn prune_before(&mut self, cutoff: Timestamp) -> usize {
        let mut pruned = 0;
        for slot in self.entries.values_mut() {
            let before = slot.len();
            slot.retain(|_, t| t.deleted_at >= cutoff);
            pruned += before - slot.len();
        }
        self.entries.retain(|_, slot| !slot.is_empty());
        pruned
    }

    /// Wire shape: `{ "<collection>": [ {id, deletedAt}, ... ] }`.
    pub fn to_wire(&self) -> BTreeMap<String, Vec<Value>> {
        self.entries
            .iter()
            .map(|(name, slot)| {
                let list = slot
                    .values()
                    .map(|t| {
                        serde_json::json!({
                            "id": t.id.to_json(),
                            "deletedAt": t.deleted_at.to_iso_string(),
                        })
                    })
                    .collect();
                (name.clone(), list)
            })
            .collect()
    }

    /// Reads the wire shape. Unreadable entries are returned separately so
    /// the caller can log them; they never abort the load.
    pub fn from_wire(wire: &BTreeMap<String, Vec<Value>>) -> (Self, Vec<MalformedRecord>) {
        let mut ledger = Self::new();
        let mut rejected = Vec::new();
        for (collection, list) in wire {
            for value in list {
                match Tombstone::from_json(collection, value) {
                    Ok(t) => {
                        ledger.absorb(t);
                    }
                    Err(e) => rejected.push(e),
                }
            }
        }
        (ledger, rejected)
    }
}

//! The authoritative local copy of every collection.
//!
//! Layout in the key-value backend:
//! - `{ns}:collections`: JSON array of collection names
//! - `{ns}:collection:{name}`: JSON array of records
//! - `{ns}:tombstones`: `{ "<name>": [ {id, deletedAt} ] }`

use crate::error::{StorageError, StorageResult};
use crate::kv::{KeyValueStore, MemoryKv};
use fleetsync_model::{Entity, Tombstone, TombstoneLedger};
use fleetsync_types::{RecordId, Timestamp};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "fleet";

/// Local collections plus the tombstone ledger.
///
/// Every mutation is written through to the backend before it returns.
pub struct RecordStore {
    kv: Arc<dyn KeyValueStore>,
    namespace: String,
    collections: BTreeMap<String, BTreeMap<RecordId, Entity>>,
    tombstones: TombstoneLedger,
    revision: u64,
}

impl RecordStore {
    /// Opens a store over `kv`, loading whatever was persisted under
    /// `namespace`.
    pub fn open(kv: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let mut store = Self {
            kv,
            namespace: namespace.into(),
            collections: BTreeMap::new(),
            tombstones: TombstoneLedger::new(),
            revision: 0,
        };
        store.load()?;
        Ok(store)
    }

    /// A store backed by process memory.
    pub fn in_memory() -> Self {
        Self {
            kv: Arc::new(MemoryKv::new()),
            namespace: DEFAULT_NAMESPACE.to_string(),
            collections: BTreeMap::new(),
            tombstones: TombstoneLedger::new(),
            revision: 0,
        }
    }

    fn load(&mut self) -> StorageResult<()> {
        let names: Vec<String> = match self.kv.get(&self.index_key())? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };

        for name in names {
            let Some(raw) = self.kv.get(&self.collection_key(&name))? else {
                continue;
            };
            let values: Vec<Value> = serde_json::from_str(&raw)?;
            let mut records = BTreeMap::new();
            for value in values {
                match Entity::from_json(value) {
                    Ok(entity) => {
                        records.insert(entity.id.clone(), entity);
                    }
                    Err(e) => warn!("Skipping unreadable local record in {}: {}", name, e),
                }
            }
            self.collections.insert(name, records);
        }

        if let Some(raw) = self.kv.get(&self.tombstones_key())? {
            let wire: BTreeMap<String, Vec<Value>> = serde_json::from_str(&raw)?;
            let (ledger, rejected) = TombstoneLedger::from_wire(&wire);
            for e in rejected {
                warn!("Skipping unreadable local tombstone: {}", e);
            }
            self.tombstones = ledger;
        }

        debug!(
            "Loaded {} collections and {} tombstones from namespace {}",
            self.collections.len(),
            self.tombstones.len(),
            self.namespace
        );
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Returns a copy of the collection, ordered by id.
    pub fn get_all(&self, collection: &str) -> Vec<Entity> {
        self.collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_by_id(&self, collection: &str, id: &RecordId) -> Option<Entity> {
        self.collections.get(collection).and_then(|c| c.get(id)).cloned()
    }

    pub fn contains(&self, collection: &str, id: &RecordId) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|c| c.contains_key(id))
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Names of every collection that has ever held a record, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    pub fn tombstones(&self) -> &TombstoneLedger {
        &self.tombstones
    }

    /// Counts mutations since the store was opened.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    // ── Local writes ─────────────────────────────────────────────

    /// Saves a record.
    ///
    /// If `record.id` names an existing record it is replaced: `createdAt`
    /// is kept and `updatedAt` advances. Otherwise the record is created
    /// under a freshly generated id, whatever id it carried.
    ///
    /// Fails with [`StorageError::InvalidData`] when the stored `updatedAt`
    /// is the last representable instant and cannot advance.
    pub fn save(&mut self, collection: &str, record: Value) -> StorageResult<Entity> {
        let Value::Object(mut data) = record else {
            return Err(StorageError::InvalidData(format!(
                "records in {collection} must be JSON objects"
            )));
        };
        let requested = data.get("id").and_then(RecordId::from_json);
        let existing = requested
            .as_ref()
            .and_then(|id| self.get_by_id(collection, id));

        let entity = match existing {
            Some(previous) => {
                let updated_at = previous.updated_at.tick().ok_or_else(|| {
                    StorageError::InvalidData(format!(
                        "updatedAt of {} in {collection} cannot advance past {}",
                        previous.id, previous.updated_at
                    ))
                })?;
                Entity::new(previous.id, previous.created_at, updated_at, data)
            }
            None => {
                if let Some(id) = &requested {
                    debug!("Id {} is not in {}, creating a new record", id, collection);
                }
                data.remove("id");
                let now = Timestamp::now();
                Entity::new(RecordId::generate(), now, now, data)
            }
        };

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(entity.id.clone(), entity.clone());
        self.persist_collection(collection)?;
        self.revision += 1;
        Ok(entity)
    }

    /// Deletes a record and records a tombstone for it.
    ///
    /// Deleting an id that is not present is a no-op and returns `None`.
    pub fn delete(&mut self, collection: &str, id: &RecordId) -> StorageResult<Option<Tombstone>> {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|c| c.remove(id));
        if removed.is_none() {
            debug!("Delete of missing record {} in {} ignored", id, collection);
            return Ok(None);
        }

        let tombstone = self.tombstones.record(collection, id.clone(), Timestamp::now());
        self.persist_collection(collection)?;
        self.persist_tombstones()?;
        self.revision += 1;
        Ok(Some(tombstone))
    }

    // ── Merge write-back ─────────────────────────────────────────

    /// Replaces a collection with merged records, stored as they are.
    pub fn replace_collection(&mut self, collection: &str, entities: Vec<Entity>) -> StorageResult<()> {
        let records = entities.into_iter().map(|e| (e.id.clone(), e)).collect();
        self.collections.insert(collection.to_string(), records);
        self.persist_collection(collection)?;
        self.revision += 1;
        Ok(())
    }

    /// Replaces the tombstone ledger.
    pub fn replace_tombstones(&mut self, ledger: TombstoneLedger) -> StorageResult<()> {
        self.tombstones = ledger;
        self.persist_tombstones()?;
        self.revision += 1;
        Ok(())
    }

    // ── Persistence ──────────────────────────────────────────────

    fn index_key(&self) -> String {
        format!("{}:collections", self.namespace)
    }

    fn collection_key(&self, collection: &str) -> String {
        format!("{}:collection:{}", self.namespace, collection)
    }

    fn tombstones_key(&self) -> String {
        format!("{}:tombstones", self.namespace)
    }

    fn persist_collection(&self, collection: &str) -> StorageResult<()> {
        let records: Vec<Value> = self
            .collections
            .get(collection)
            .map(|c| c.values().map(Entity::to_json).collect())
            .unwrap_or_default();
        self.kv
            .set(&self.collection_key(collection), &serde_json::to_string(&records)?)?;
        self.kv
            .set(&self.index_key(), &serde_json::to_string(&self.collection_names())?)
    }

    fn persist_tombstones(&self) -> StorageResult<()> {
        self.kv.set(
            &self.tombstones_key(),
            &serde_json::to_string(&self.tombstones.to_wire())?,
        )
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("namespace", &self.namespace)
            .field("collections", &self.collections.len())
            .field("tombstones", &self.tombstones.len())
            .field("revision", &self.revision)
            .finish()
    }
}

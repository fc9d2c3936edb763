//! The consolidated snapshot exchanged with the remote store.
//!
//! ```json
//! {
//!   "collections": { "<name>": [ {..entity, id, createdAt, updatedAt} ] },
//!   "tombstones":  { "<name>": [ {id, deletedAt} ] },
//!   "lastUpdate": "<ISO-8601>",
//!   "version": "<string>"
//! }
//! ```
//!
//! Records are kept as raw JSON so that one malformed record can be skipped
//! without rejecting the whole snapshot.

use crate::entity::{Entity, MalformedRecord};
use crate::tombstone::TombstoneLedger;
use fleetsync_types::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "2.0";

/// All collections and tombstones of one replica.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedSnapshot {
    #[serde(deserialize_with = "arrays_only")]
    pub collections: BTreeMap<String, Vec<Value>>,
    #[serde(default, deserialize_with = "optional_arrays_only")]
    pub tombstones: BTreeMap<String, Vec<Value>>,
    #[serde(rename = "lastUpdate", default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<Timestamp>,
    #[serde(default)]
    pub version: String,
}

/// Reads a name-to-array map, dropping entries whose value is not an array.
fn arrays_only<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::Array(items) => Some((name, items)),
            other => {
                warn!("Skipping {}: expected an array, found {}", name, json_kind(&other));
                None
            }
        })
        .collect())
}

fn optional_arrays_only<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(value) => arrays_only(value).map_err(serde::de::Error::custom),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The part of a snapshot that identifies its data, used for fingerprinting.
///
/// `lastUpdate` and `version` change on every build and are left out.
#[derive(Debug, Serialize)]
pub struct SnapshotContent<'a> {
    pub collections: &'a BTreeMap<String, Vec<Value>>,
    pub tombstones: &'a BTreeMap<String, Vec<Value>>,
}

impl ConsolidatedSnapshot {
    /// A snapshot with no collections, used when the remote has nothing yet.
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            ..Default::default()
        }
    }

    /// Builds a snapshot from typed collections and a ledger.
    pub fn from_parts<'a, I>(
        collections: I,
        tombstones: &TombstoneLedger,
        last_update: Timestamp,
        version: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [Entity])>,
    {
        let collections = collections
            .into_iter()
            .map(|(name, entities)| {
                (
                    name.to_string(),
                    entities.iter().map(Entity::to_json).collect(),
                )
            })
            .collect();
        Self {
            collections,
            tombstones: tombstones.to_wire(),
            last_update: Some(last_update),
            version: version.into(),
        }
    }

    pub fn content(&self) -> SnapshotContent<'_> {
        SnapshotContent {
            collections: &self.collections,
            tombstones: &self.tombstones,
        }
    }

    /// Raw records of one collection, `None` if the snapshot does not carry it.
    pub fn collection(&self, name: &str) -> Option<&[Value]> {
        self.collections.get(name).map(Vec::as_slice)
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Parses the snapshot's tombstones.
    pub fn tombstone_ledger(&self) -> (TombstoneLedger, Vec<MalformedRecord>) {
        TombstoneLedger::from_wire(&self.tombstones)
    }

    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0 && self.tombstones.values().all(Vec::is_empty)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names of the fleet collections.
pub mod collections {
    pub const VEHICLES: &str = "vehicles";
    pub const DRIVERS: &str = "drivers";
    pub const EXPENSES: &str = "expenses";
    pub const FREIGHTS: &str = "freights";
    pub const DOCUMENTS: &str = "documents";
    pub const RECEIPTS: &str = "receipts";
    pub const USERS: &str = "users";

    /// Every collection the fleet application stores.
    pub const ALL: [&str; 7] = [VEHICLES, DRIVERS, EXPENSES, FREIGHTS, DOCUMENTS, RECEIPTS, USERS];
}

/// How a collection is reconciled during sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Per-record reconciliation: newest `updatedAt` wins, tombstones suppress
    /// resurrection.
    #[default]
    PerRecordNewestWins,
    /// The remote copy replaces the local collection wholesale. Used for
    /// records whose partial merge is unsafe (user credentials).
    RemoteOverwrite,
}

/// One side of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Local,
    #[default]
    Remote,
}

/// Describes how one collection takes part in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
    /// Side that wins when both copies carry the same `updatedAt`.
    #[serde(default)]
    pub tie_priority: Side,
    /// Domain fields a record must carry to be accepted from the remote.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

impl CollectionSchema {
    /// Per-record newest-wins schema with remote tie priority.
    pub fn newest_wins(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            merge_strategy: MergeStrategy::PerRecordNewestWins,
            tie_priority: Side::Remote,
            required_fields: Vec::new(),
        }
    }

    /// Whole-collection remote overwrite schema.
    pub fn remote_overwrite(name: impl Into<String>) -> Self {
        Self {
            merge_strategy: MergeStrategy::RemoteOverwrite,
            ..Self::newest_wins(name)
        }
    }

    #[must_use]
    pub fn with_tie_priority(mut self, side: Side) -> Self {
        self.tie_priority = side;
        self
    }

    #[must_use]
    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// The schemas the fleet application ships with.
    pub fn fleet_defaults() -> Vec<Self> {
        collections::ALL
            .iter()
            .map(|name| match *name {
                collections::USERS => Self::remote_overwrite(*name),
                _ => Self::newest_wins(*name),
            })
            .collect()
    }
}

/// Lookup of collection schemas by name.
///
/// Collections without a registered schema (for example ones introduced by
/// a newer client) merge with the default per-record strategy.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, CollectionSchema>,
}

impl SchemaRegistry {
    pub fn new(schemas: impl IntoIterator<Item = CollectionSchema>) -> Self {
        Self {
            schemas: schemas.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    pub fn fleet() -> Self {
        Self::new(CollectionSchema::fleet_defaults())
    }

    /// Registers or replaces a schema.
    pub fn register(&mut self, schema: CollectionSchema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    /// Returns the schema for `name`, or the default one.
    pub fn get(&self, name: &str) -> CollectionSchema {
        self.schemas
            .get(name)
            .cloned()
            .unwrap_or_else(|| CollectionSchema::newest_wins(name))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Names of all registered collections, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

//! Sync configuration.

use crate::error::{SyncError, SyncResult};
use crate::fingerprint::FingerprintAlgorithm;
use fleetsync_model::{CollectionSchema, SchemaRegistry, Side, SNAPSHOT_VERSION};
use serde::{Deserialize, Serialize};

/// Longest accepted tombstone retention, about a century.
pub const MAX_TOMBSTONE_RETENTION_DAYS: u32 = 36_500;

/// What to do when a sync is requested while another one runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Same direction: share the running result. Other direction: wait for
    /// it, then run.
    #[default]
    Coalesce,
    /// Fail with `SyncError::ConcurrentSync`.
    Reject,
}

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Device name for identification in logs.
    pub device_name: String,
    /// Key of the consolidated snapshot in the remote store.
    pub consolidated_key: String,
    /// Key of a per-collection object; `{collection}` is replaced by the name.
    pub legacy_key_template: String,
    /// Read per-collection objects when no consolidated snapshot exists.
    pub legacy_fallback: bool,
    /// Also upload per-collection objects for older clients.
    pub write_legacy_layout: bool,
    /// `version` written into uploaded snapshots.
    pub snapshot_version: String,
    pub fingerprint: FingerprintAlgorithm,
    pub concurrency: ConcurrencyPolicy,
    /// Overrides every collection's tie priority: `true` remote, `false`
    /// local. `None` uses the schemas.
    pub remote_priority: Option<bool>,
    /// Period of the automatic full sync; 0 disables it.
    pub auto_sync_interval_secs: u64,
    /// Quiet time after a local write before the automatic upload.
    pub write_debounce_ms: u64,
    /// Tombstones older than this are pruned on download. `None` keeps them.
    pub tombstone_retention_days: Option<u32>,
    /// Collection schemas; unlisted collections merge newest-wins.
    pub collections: Vec<CollectionSchema>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            device_name: "FleetSync Device".to_string(),
            consolidated_key: "fleet-data.json".to_string(),
            legacy_key_template: "{collection}.json".to_string(),
            legacy_fallback: true,
            write_legacy_layout: false,
            snapshot_version: SNAPSHOT_VERSION.to_string(),
            fingerprint: FingerprintAlgorithm::default(),
            concurrency: ConcurrencyPolicy::default(),
            remote_priority: None,
            auto_sync_interval_secs: 300,
            write_debounce_ms: 2_000,
            tombstone_retention_days: None,
            collections: CollectionSchema::fleet_defaults(),
        }
    }
}

impl SyncConfig {
    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if let Some(days) = self.tombstone_retention_days {
            if days > MAX_TOMBSTONE_RETENTION_DAYS {
                return Err(SyncError::InvalidConfig(format!(
                    "tombstone_retention_days is {days}, the limit is {MAX_TOMBSTONE_RETENTION_DAYS}"
                )));
            }
        }
        Ok(())
    }

    /// Remote key of one collection in the legacy layout.
    pub fn legacy_key(&self, collection: &str) -> String {
        self.legacy_key_template.replace("{collection}", collection)
    }

    pub fn schema_registry(&self) -> SchemaRegistry {
        SchemaRegistry::new(self.collections.iter().cloned())
    }

    pub fn tie_override(&self) -> Option<Side> {
        self.remote_priority
            .map(|remote| if remote { Side::Remote } else { Side::Local })
    }
}

use fleetsync_model::{MergeStrategy, Side};
use fleetsync_sync::{
    ConcurrencyPolicy, FingerprintAlgorithm, SyncConfig, SyncError, MAX_TOMBSTONE_RETENTION_DAYS,
};
use pretty_assertions::assert_eq;

#[test]
fn config_defaults() {
    let cfg = SyncConfig::default();
    assert_eq!(cfg.consolidated_key, "fleet-data.json");
    assert_eq!(cfg.legacy_key_template, "{collection}.json");
    assert!(cfg.legacy_fallback);
    assert!(!cfg.write_legacy_layout);
    assert_eq!(cfg.snapshot_version, "2.0");
    assert_eq!(cfg.fingerprint, FingerprintAlgorithm::Rolling32);
    assert_eq!(cfg.concurrency, ConcurrencyPolicy::Coalesce);
    assert_eq!(cfg.remote_priority, None);
    assert_eq!(cfg.auto_sync_interval_secs, 300);
    assert_eq!(cfg.write_debounce_ms, 2_000);
    assert_eq!(cfg.tombstone_retention_days, None);
    assert_eq!(cfg.collections.len(), 7);
}

#[test]
fn config_partial_json_keeps_defaults() {
    let cfg = SyncConfig::from_json(
        r#"{
            "device_name": "Truck 12 tablet",
            "fingerprint": "sha256",
            "concurrency": "reject",
            "tombstone_retention_days": 90
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.device_name, "Truck 12 tablet");
    assert_eq!(cfg.fingerprint, FingerprintAlgorithm::Sha256);
    assert_eq!(cfg.concurrency, ConcurrencyPolicy::Reject);
    assert_eq!(cfg.tombstone_retention_days, Some(90));
    assert_eq!(cfg.consolidated_key, "fleet-data.json");
    assert_eq!(cfg.collections.len(), 7);
}

#[test]
fn config_custom_collections() {
    let cfg = SyncConfig::from_json(
        r#"{"collections": [
            {"name": "vehicles", "tie_priority": "local", "required_fields": ["plate"]},
            {"name": "users", "merge_strategy": "remote_overwrite"}
        ]}"#,
    )
    .unwrap();

    let registry = cfg.schema_registry();
    let vehicles = registry.get("vehicles");
    assert_eq!(vehicles.tie_priority, Side::Local);
    assert_eq!(vehicles.required_fields, vec!["plate".to_string()]);
    assert_eq!(registry.get("users").merge_strategy, MergeStrategy::RemoteOverwrite);
    assert!(!registry.is_registered("drivers"));
    assert_eq!(registry.get("drivers").merge_strategy, MergeStrategy::PerRecordNewestWins);
}

#[test]
fn config_invalid_json_is_serialization_error() {
    let err = SyncConfig::from_json("{\"legacy_fallback\": \"yes\"}").unwrap_err();
    assert!(matches!(err, SyncError::Serialization(_)));
}

#[test]
fn config_rejects_retention_past_limit() {
    let json = format!(r#"{{"tombstone_retention_days": {}}}"#, u32::MAX);
    let err = SyncConfig::from_json(&json).unwrap_err();
    assert!(matches!(err, SyncError::InvalidConfig(_)));

    let json = format!(
        r#"{{"tombstone_retention_days": {MAX_TOMBSTONE_RETENTION_DAYS}}}"#
    );
    let cfg = SyncConfig::from_json(&json).unwrap();
    assert_eq!(cfg.tombstone_retention_days, Some(MAX_TOMBSTONE_RETENTION_DAYS));
}

#[test]
fn legacy_key_substitutes_collection() {
    let mut cfg = SyncConfig::default();
    assert_eq!(cfg.legacy_key("drivers"), "drivers.json");

    cfg.legacy_key_template = "legacy/{collection}-v1.json".to_string();
    assert_eq!(cfg.legacy_key("freights"), "legacy/freights-v1.json");
}

#[test]
fn tie_override_from_remote_priority() {
    let mut cfg = SyncConfig::default();
    assert_eq!(cfg.tie_override(), None);

    cfg.remote_priority = Some(true);
    assert_eq!(cfg.tie_override(), Some(Side::Remote));

    cfg.remote_priority = Some(false);
    assert_eq!(cfg.tie_override(), Some(Side::Local));
}

#[test]
fn config_serde_roundtrip() {
    let cfg = SyncConfig {
        write_legacy_layout: true,
        remote_priority: Some(false),
        ..Default::default()
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(SyncConfig::from_json(&json).unwrap(), cfg);
}

use fleetsync_model::{MalformedRecord, Tombstone, TombstoneLedger};
use fleetsync_types::{RecordId, Timestamp};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;

fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

// ── record / absorb ──────────────────────────────────────────────

#[test]
fn record_stores_tombstone() {
    let mut ledger = TombstoneLedger::new();
    let t = ledger.record("vehicles", RecordId::Int(7), ts("2024-03-01"));
    assert_eq!(t.collection, "vehicles");
    assert!(ledger.contains("vehicles", &RecordId::Int(7)));
    assert!(!ledger.contains("drivers", &RecordId::Int(7)));
    assert_eq!(ledger.len(), 1);
}

#[test]
fn record_twice_keeps_one_entry() {
    let mut ledger = TombstoneLedger::new();
    ledger.record("vehicles", RecordId::Int(7), ts("2024-03-01"));
    ledger.record("vehicles", RecordId::Int(7), ts("2024-03-01"));
    assert_eq!(ledger.len(), 1);
}

#[test]
fn absorb_keeps_newest_deleted_at() {
    let mut ledger = TombstoneLedger::new();
    assert!(ledger.absorb(Tombstone::new("drivers", 1.into(), ts("2024-01-05"))));
    assert!(!ledger.absorb(Tombstone::new("drivers", 1.into(), ts("2024-01-01"))));
    assert!(ledger.absorb(Tombstone::new("drivers", 1.into(), ts("2024-02-01"))));
    assert_eq!(
        ledger.get("drivers", &RecordId::Int(1)).unwrap().deleted_at,
        ts("2024-02-01")
    );
}

#[test]
fn merge_is_union_by_id() {
    let mut a = TombstoneLedger::new();
    a.record("drivers", 1.into(), ts("2024-01-01"));
    a.record("drivers", 2.into(), ts("2024-01-05"));

    let mut b = TombstoneLedger::new();
    b.record("drivers", 2.into(), ts("2024-01-03"));
    b.record("expenses", 9.into(), ts("2024-01-04"));

    let changed = a.merge(&b);
    assert_eq!(changed, 1);
    assert_eq!(a.len(), 3);
    assert_eq!(
        a.get("drivers", &RecordId::Int(2)).unwrap().deleted_at,
        ts("2024-01-05")
    );
    let names: Vec<_> = a.collections().collect();
    assert_eq!(names, vec!["drivers", "expenses"]);
}

#[test]
fn merge_twice_is_idempotent() {
    let mut a = TombstoneLedger::new();
    let mut b = TombstoneLedger::new();
    b.record("freights", "f-1".into(), ts("2024-01-01"));
    assert_eq!(a.merge(&b), 1);
    let snapshot = a.clone();
    assert_eq!(a.merge(&b), 0);
    assert_eq!(a, snapshot);
}

// ── prune ────────────────────────────────────────────────────────

#[test]
fn prune_before_cutoff() {
    let mut ledger = TombstoneLedger::new();
    ledger.record("drivers", 1.into(), ts("2023-01-01"));
    ledger.record("drivers", 2.into(), ts("2024-06-01"));
    ledger.record("receipts", 3.into(), ts("2023-05-01"));

    let pruned = ledger.prune_before(ts("2024-01-01"));
    assert_eq!(pruned, 2);
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.collections().count(), 1);
}

// ── wire format ──────────────────────────────────────────────────

#[test]
fn wire_shape_omits_collection() {
    let mut ledger = TombstoneLedger::new();
    ledger.record("vehicles", 7.into(), ts("2024-03-01"));
    let wire = ledger.to_wire();
    assert_eq!(
        serde_json::to_value(&wire).unwrap(),
        json!({"vehicles": [{"id": 7, "deletedAt": "2024-03-01T00:00:00.000Z"}]})
    );
}

#[test]
fn from_wire_restores_collection_and_skips_bad_entries() {
    let mut wire = BTreeMap::new();
    wire.insert(
        "vehicles".to_string(),
        vec![
            json!({"id": 7, "deletedAt": "2024-03-01"}),
            json!({"id": 8}),
            json!("junk"),
        ],
    );
    let (ledger, rejected) = TombstoneLedger::from_wire(&wire);
    assert_eq!(ledger.len(), 1);
    assert_eq!(
        ledger.for_collection("vehicles")[0].collection,
        "vehicles".to_string()
    );
    assert_eq!(rejected.len(), 2);
    assert!(rejected.contains(&MalformedRecord::NotAnObject));
}

#[test]
fn wire_roundtrip() {
    let mut ledger = TombstoneLedger::new();
    ledger.record("vehicles", 7.into(), ts("2024-03-01"));
    ledger.record("users", "u-1".into(), ts("2024-03-02"));
    let (back, rejected) = TombstoneLedger::from_wire(&ledger.to_wire());
    assert!(rejected.is_empty());
    assert_eq!(back, ledger);
}

use fleetsync_model::ConsolidatedSnapshot;
use fleetsync_sync::fingerprint::rolling32;
use fleetsync_sync::{canonical_json, ChangeDetector, FingerprintAlgorithm};
use serde_json::{json, Value};

fn snapshot(value: Value) -> ConsolidatedSnapshot {
    serde_json::from_value(value).unwrap()
}

#[test]
fn fingerprint_is_stable() {
    let detector = ChangeDetector::default();
    let a = snapshot(json!({"collections": {"a": [{"id": 1, "updatedAt": "2024-01-01"}]}}));
    let b = snapshot(json!({"collections": {"a": [{"id": 1, "updatedAt": "2024-01-01"}]}}));

    assert_eq!(detector.fingerprint(&a), detector.fingerprint(&a));
    assert_eq!(detector.fingerprint(&a), detector.fingerprint(&b));
}

#[test]
fn fingerprint_changes_with_updated_at() {
    let detector = ChangeDetector::default();
    let before = snapshot(json!({"collections": {"a": [{"id": 1, "updatedAt": "2024-01-01"}]}}));
    let after = snapshot(json!({"collections": {"a": [{"id": 1, "updatedAt": "2024-01-02"}]}}));

    assert_ne!(detector.fingerprint(&before), detector.fingerprint(&after));
}

#[test]
fn fingerprint_ignores_key_order() {
    let detector = ChangeDetector::default();
    let a = snapshot(json!({"collections": {
        "a": [{"id": 1, "updatedAt": "2024-01-01", "meta": {"x": 1, "y": 2}}],
        "b": []
    }}));
    let b: ConsolidatedSnapshot = serde_json::from_str(
        r#"{"collections": {"b": [], "a": [{"meta": {"y": 2, "x": 1}, "updatedAt": "2024-01-01", "id": 1}]}}"#,
    )
    .unwrap();

    assert_eq!(detector.fingerprint(&a), detector.fingerprint(&b));
}

#[test]
fn fingerprint_ignores_last_update_and_version() {
    let detector = ChangeDetector::default();
    let a = snapshot(json!({"collections": {}, "lastUpdate": "2024-01-01", "version": "1.0"}));
    let b = snapshot(json!({"collections": {}, "lastUpdate": "2025-06-01", "version": "2.0"}));

    assert_eq!(detector.fingerprint(&a), detector.fingerprint(&b));
}

#[test]
fn fingerprint_covers_tombstones() {
    let detector = ChangeDetector::default();
    let a = snapshot(json!({"collections": {}}));
    let b = snapshot(json!({
        "collections": {},
        "tombstones": {"vehicles": [{"id": 7, "deletedAt": "2024-01-03"}]}
    }));

    assert_ne!(detector.fingerprint(&a), detector.fingerprint(&b));
}

#[test]
fn snapshot_fingerprint_matches_value_fingerprint() {
    let detector = ChangeDetector::default();
    let content = json!({
        "collections": {"drivers": [{"id": "d-1", "name": "Ana", "updatedAt": "2024-01-01"}]},
        "tombstones": {"drivers": [{"id": 2, "deletedAt": "2024-01-02"}]}
    });

    assert_eq!(
        detector.fingerprint(&snapshot(content.clone())),
        detector.fingerprint_value(&content)
    );
}

#[test]
fn rolling_fingerprint_is_eight_hex_digits() {
    let fp = ChangeDetector::default().fingerprint(&ConsolidatedSnapshot::empty());
    assert_eq!(fp.as_str().len(), 8);
    assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn sha256_fingerprint_is_sixty_four_hex_digits() {
    let detector = ChangeDetector::new(FingerprintAlgorithm::Sha256);
    let fp = detector.fingerprint(&ConsolidatedSnapshot::empty());
    assert_eq!(fp.as_str().len(), 64);
    assert_eq!(detector.algorithm(), FingerprintAlgorithm::Sha256);
}

#[test]
fn rolling_hash_known_values() {
    assert_eq!(rolling32(""), 0);
    assert_eq!(rolling32("a"), 97);
    assert_eq!(rolling32("ab"), 97 * 31 + 98);
    // UTF-16 code units, not bytes.
    assert_eq!(rolling32("é"), 0xe9);
}

#[test]
fn rolling_hash_wraps() {
    let long = "z".repeat(1_000);
    let _ = rolling32(&long);
}

#[test]
fn has_changed_without_previous() {
    let detector = ChangeDetector::default();
    assert!(detector.has_changed(None, &ConsolidatedSnapshot::empty()));
}

#[test]
fn has_changed_compares_fingerprints() {
    let detector = ChangeDetector::default();
    let a = snapshot(json!({"collections": {"a": [{"id": 1, "updatedAt": "2024-01-01"}]}}));
    let b = snapshot(json!({"collections": {"a": [{"id": 1, "updatedAt": "2024-01-02"}]}}));
    let fp = detector.fingerprint(&a);

    assert!(!detector.has_changed(Some(&fp), &a));
    assert!(detector.has_changed(Some(&fp), &b));
}

#[test]
fn canonical_json_sorts_nested_keys() {
    let value: Value = serde_json::from_str(r#"{"b": [{"z": 1, "a": "x"}], "a": null}"#).unwrap();
    assert_eq!(canonical_json(&value), r#"{"a":null,"b":[{"a":"x","z":1}]}"#);
}

#[test]
fn canonical_json_escapes_strings() {
    assert_eq!(canonical_json(&json!({"k": "a\"b"})), r#"{"k":"a\"b"}"#);
}

#[test]
fn fingerprint_display_matches_str() {
    let fp = ChangeDetector::default().fingerprint(&ConsolidatedSnapshot::empty());
    assert_eq!(fp.to_string(), fp.as_str());
}

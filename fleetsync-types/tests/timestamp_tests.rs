use chrono::{DateTime, Utc};
use fleetsync_types::Timestamp;
use proptest::prelude::*;
use serde_json::json;

const YEAR_3000_MS: i64 = 32_503_680_000_000;

// ── Construction ─────────────────────────────────────────────────

#[test]
fn now_is_after_epoch() {
    let ts = Timestamp::now();
    assert!(ts.as_millis() > 0);
}

#[test]
fn from_millis_roundtrip() {
    let ts = Timestamp::from_millis(1_704_067_200_123).unwrap();
    assert_eq!(ts.as_millis(), 1_704_067_200_123);
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parse_rfc3339_with_offset() {
    let ts = Timestamp::parse("2024-01-01T02:00:00+02:00").unwrap();
    assert_eq!(ts.to_iso_string(), "2024-01-01T00:00:00.000Z");
}

#[test]
fn parse_browser_iso_string() {
    let ts = Timestamp::parse("2024-03-05T10:11:12.345Z").unwrap();
    assert_eq!(ts.to_iso_string(), "2024-03-05T10:11:12.345Z");
}

#[test]
fn parse_naive_datetime_as_utc() {
    let ts = Timestamp::parse("2024-03-05T10:11:12").unwrap();
    assert_eq!(ts.to_iso_string(), "2024-03-05T10:11:12.000Z");
}

#[test]
fn parse_bare_date_as_midnight() {
    let ts = Timestamp::parse("2024-01-01").unwrap();
    assert_eq!(ts.to_iso_string(), "2024-01-01T00:00:00.000Z");
}

#[test]
fn parse_truncates_to_millis() {
    let ts = Timestamp::parse("2024-01-01T00:00:00.123456789Z").unwrap();
    assert_eq!(ts.as_millis() % 1000, 123);
}

#[test]
fn parse_garbage_fails() {
    assert!(Timestamp::parse("yesterday").is_err());
    assert!(Timestamp::parse("").is_err());
}

#[test]
fn from_json_accepts_strings_and_millis() {
    assert!(Timestamp::from_json(&json!("2024-01-01")).is_some());
    assert_eq!(
        Timestamp::from_json(&json!(1_000)).map(|t| t.as_millis()),
        Some(1_000)
    );
    assert!(Timestamp::from_json(&json!(null)).is_none());
    assert!(Timestamp::from_json(&json!({"at": 1})).is_none());
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn later_dates_compare_greater() {
    let a = Timestamp::parse("2024-01-01").unwrap();
    let b = Timestamp::parse("2024-01-02").unwrap();
    assert!(a < b);
    assert!(b > a);
}

#[test]
fn equal_instants_in_different_formats_are_equal() {
    let a = Timestamp::parse("2024-01-01").unwrap();
    let b = Timestamp::parse("2024-01-01T00:00:00.000Z").unwrap();
    assert_eq!(a, b);
    assert!(a <= b && a >= b);
}

// ── tick ─────────────────────────────────────────────────────────

#[test]
fn tick_is_monotonic() {
    let t1 = Timestamp::now();
    let t2 = t1.tick().unwrap();
    let t3 = t2.tick().unwrap();
    assert!(t1 < t2);
    assert!(t2 < t3);
}

#[test]
fn tick_from_future_adds_one_millisecond() {
    let ts = Timestamp::from_millis(YEAR_3000_MS).unwrap();
    assert_eq!(ts.tick().unwrap().as_millis(), YEAR_3000_MS + 1);
}

#[test]
fn tick_from_past_jumps_to_now() {
    let ts = Timestamp::from_millis(1_000).unwrap();
    let ticked = ts.tick().unwrap();
    assert!(ticked.as_millis() > 1_000_000);
}

#[test]
fn tick_at_last_instant_is_none() {
    let last = Timestamp::from(DateTime::<Utc>::MAX_UTC);
    assert!(last.tick().is_none());
}

#[test]
fn plus_millis_shifts_both_ways() {
    let ts = Timestamp::parse("2024-01-02").unwrap();
    assert_eq!(ts.plus_millis(-86_400_000), Some(Timestamp::parse("2024-01-01").unwrap()));
    assert_eq!(ts.plus_millis(1).unwrap().as_millis(), ts.as_millis() + 1);
}

#[test]
fn plus_millis_out_of_range_is_none() {
    let ts = Timestamp::now();
    assert!(ts.plus_millis(i64::MAX).is_none());
    assert!(ts.plus_millis(-i64::from(u32::MAX) * 86_400_000).is_none());
    assert!(Timestamp::from(DateTime::<Utc>::MIN_UTC).plus_millis(-1).is_none());
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serializes_as_iso_string() {
    let ts = Timestamp::parse("2024-01-01").unwrap();
    let json = serde_json::to_value(ts).unwrap();
    assert_eq!(json, json!("2024-01-01T00:00:00.000Z"));
}

#[test]
fn deserializes_from_millis() {
    let ts: Timestamp = serde_json::from_value(json!(86_400_000)).unwrap();
    assert_eq!(ts.to_iso_string(), "1970-01-02T00:00:00.000Z");
}

#[test]
fn deserialize_rejects_bool() {
    let result: Result<Timestamp, _> = serde_json::from_value(json!(true));
    assert!(result.is_err());
}

proptest! {
    #[test]
    fn iso_string_roundtrips(millis in 0i64..YEAR_3000_MS) {
        let ts = Timestamp::from_millis(millis).unwrap();
        let parsed = Timestamp::parse(&ts.to_iso_string()).unwrap();
        prop_assert_eq!(parsed, ts);
    }

    #[test]
    fn ordering_matches_millis(a in 0i64..YEAR_3000_MS, b in 0i64..YEAR_3000_MS) {
        let ta = Timestamp::from_millis(a).unwrap();
        let tb = Timestamp::from_millis(b).unwrap();
        prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
    }
}

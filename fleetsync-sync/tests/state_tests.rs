use fleetsync_sync::{
    ConcurrencyPolicy, SyncDirection, SyncError, SyncPhase, SyncSession, SyncTrigger,
    TransferError,
};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── SyncSession ─────────────────────────────────────────────────

#[test]
fn new_session_is_idle() {
    let session = SyncSession::new();
    assert!(session.is_idle());
    assert_eq!(session.phase, SyncPhase::Idle);
    assert!(session.last_uploaded_fingerprint.is_none());
    assert_eq!(session.failures, 0);
}

#[test]
fn begin_marks_active() {
    let mut session = SyncSession::new();
    session.begin(SyncDirection::Down);
    assert_eq!(session.active, Some(SyncDirection::Down));
    assert!(!session.is_idle());
}

#[test]
fn finish_returns_to_idle_and_clears_error() {
    let mut session = SyncSession::new();
    session.begin(SyncDirection::Up);
    session.fail(&SyncError::ChannelClosed);
    assert_eq!(session.last_error.as_deref(), Some("channel closed"));

    session.begin(SyncDirection::Up);
    session.phase = SyncPhase::Transmitting;
    session.finish();

    assert!(session.is_idle());
    assert!(session.last_error.is_none());
    assert_eq!(session.failures, 1);
}

#[test]
fn fail_records_error() {
    let mut session = SyncSession::new();
    session.begin(SyncDirection::Full);
    session.phase = SyncPhase::Fetching;
    session.fail(&SyncError::Transfer(TransferError::Network("timeout".into())));

    assert!(session.is_idle());
    assert_eq!(session.failures, 1);
    assert_eq!(
        session.last_error.as_deref(),
        Some("transfer error: network error: timeout")
    );
}

#[test]
fn session_serde_roundtrip() {
    let mut session = SyncSession::new();
    session.uploads = 3;
    session.downloads_skipped = 2;
    let json = serde_json::to_string(&session).unwrap();
    let back: SyncSession = serde_json::from_str(&json).unwrap();
    assert_eq!(back, session);
}

// ── Enums ───────────────────────────────────────────────────────

#[test]
fn direction_display() {
    assert_eq!(SyncDirection::Up.to_string(), "upload");
    assert_eq!(SyncDirection::Down.to_string(), "download");
    assert_eq!(SyncDirection::Full.to_string(), "full");
}

#[test]
fn enums_serialize_snake_case() {
    assert_eq!(serde_json::to_value(SyncPhase::Transmitting).unwrap(), json!("transmitting"));
    assert_eq!(serde_json::to_value(SyncTrigger::OnWrite).unwrap(), json!("on_write"));
    assert_eq!(serde_json::to_value(SyncDirection::Full).unwrap(), json!("full"));
    assert_eq!(serde_json::to_value(ConcurrencyPolicy::Reject).unwrap(), json!("reject"));
}

#[test]
fn enum_defaults() {
    assert_eq!(SyncPhase::default(), SyncPhase::Idle);
    assert_eq!(SyncTrigger::default(), SyncTrigger::Manual);
    assert_eq!(ConcurrencyPolicy::default(), ConcurrencyPolicy::Coalesce);
}

#[test]
fn concurrent_sync_error_names_active_direction() {
    let err = SyncError::ConcurrentSync {
        active: SyncDirection::Up,
    };
    assert_eq!(err.to_string(), "upload sync already in progress");
}

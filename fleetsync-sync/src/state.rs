//! Sync session tracking.
//!
//! The orchestrator owns one [`SyncSession`] and updates it as runs move
//! through their phases. Callers read a copy through
//! `SyncOrchestrator::session()`.

use crate::error::SyncError;
use crate::fingerprint::Fingerprint;
use fleetsync_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a sync run currently is.
///
/// Download: `Idle → Fetching → Merging → Writing → Idle`.
/// Upload: `Idle → Snapshotting → (Skipped | Transmitting) → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Merging,
    Writing,
    Snapshotting,
    Skipped,
    Transmitting,
}

/// Which half of the cycle a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    Up,
    Down,
    /// Down, then up.
    Full,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncDirection::Up => "upload",
            SyncDirection::Down => "download",
            SyncDirection::Full => "full",
        })
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    #[default]
    Manual,
    Periodic,
    OnWrite,
}

/// Sync status of this device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSession {
    /// Current phase.
    pub phase: SyncPhase,
    /// Direction of the run in progress, if any.
    pub active: Option<SyncDirection>,
    /// Fingerprint of the last snapshot the remote is known to hold.
    pub last_uploaded_fingerprint: Option<Fingerprint>,
    /// Fingerprint of the last remote snapshot merged here.
    pub last_merged_remote_fingerprint: Option<Fingerprint>,
    /// Fingerprint of the local data right after that merge.
    pub last_merged_local_fingerprint: Option<Fingerprint>,
    pub last_upload_at: Option<Timestamp>,
    pub last_download_at: Option<Timestamp>,
    /// Message of the last failed run; cleared by the next success.
    pub last_error: Option<String>,
    pub uploads: u64,
    pub uploads_skipped: u64,
    pub downloads: u64,
    pub downloads_skipped: u64,
    pub failures: u64,
}

impl SyncSession {
    /// Creates a new idle session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SyncPhase::Idle && self.active.is_none()
    }

    /// Marks the start of a run.
    pub fn begin(&mut self, direction: SyncDirection) {
        self.active = Some(direction);
    }

    /// Returns to idle after a successful run.
    pub fn finish(&mut self) {
        self.phase = SyncPhase::Idle;
        self.active = None;
        self.last_error = None;
    }

    /// Returns to idle after a failed run.
    pub fn fail(&mut self, error: &SyncError) {
        self.phase = SyncPhase::Idle;
        self.active = None;
        self.last_error = Some(error.to_string());
        self.failures += 1;
    }
}

//! Results returned by sync runs.

use crate::fingerprint::Fingerprint;
use crate::merge::MergeStats;
use crate::state::{SyncDirection, SyncTrigger};
use fleetsync_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the remote data of a download came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteSource {
    /// The consolidated snapshot.
    Consolidated,
    /// Per-collection objects written by older clients.
    Legacy,
    /// Nothing stored yet; merged as an empty remote.
    Absent,
}

/// Result of the upload half of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Local data matches what the remote already holds; nothing was sent.
    Skipped { fingerprint: Fingerprint },
    Uploaded {
        fingerprint: Fingerprint,
        records: usize,
        /// Per-collection objects written alongside the snapshot.
        legacy_objects: usize,
    },
}

impl UploadOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, UploadOutcome::Skipped { .. })
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            UploadOutcome::Skipped { fingerprint } | UploadOutcome::Uploaded { fingerprint, .. } => {
                fingerprint
            }
        }
    }
}

/// Result of the download half of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub source: RemoteSource,
    pub remote_fingerprint: Fingerprint,
    /// Neither side changed since the last merge; nothing was merged.
    pub skipped: bool,
    /// Merge statistics per collection.
    pub collections: BTreeMap<String, MergeStats>,
    pub tombstones_added: usize,
    pub collections_written: usize,
    pub tombstones_pruned: usize,
}

impl DownloadOutcome {
    /// True if the merge changed any local collection.
    pub fn changed_local(&self) -> bool {
        self.collections_written > 0
    }
}

/// Everything one run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub trigger: SyncTrigger,
    pub download: Option<DownloadOutcome>,
    pub upload: Option<UploadOutcome>,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}

//! Sync orchestrator: drives upload and download cycles.
//!
//! Each run executes on its own tokio task, so dropping the caller's future
//! never interrupts a merge or a write-back. At most one run is in flight
//! per orchestrator; what happens to a request that arrives meanwhile is
//! decided by [`ConcurrencyPolicy`].

use crate::cloud::BlobTransfer;
use crate::config::{ConcurrencyPolicy, SyncConfig};
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::report::{DownloadOutcome, RemoteSource, SyncReport, UploadOutcome};
use crate::state::{SyncDirection, SyncPhase, SyncSession, SyncTrigger};
use fleetsync_model::ConsolidatedSnapshot;
use fleetsync_storage::RecordStore;
use fleetsync_types::Timestamp;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

type SharedRun = Shared<BoxFuture<'static, SyncResult<SyncReport>>>;

/// The run currently owning the gate.
struct InFlight {
    direction: SyncDirection,
    run: SharedRun,
    done: Arc<AtomicBool>,
}

impl InFlight {
    fn is_running(&self) -> bool {
        !self.done.load(Ordering::SeqCst)
    }
}

/// Flags a run as finished when its task ends, even by panic.
struct DoneOnDrop(Arc<AtomicBool>);

impl Drop for DoneOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct Inner {
    config: SyncConfig,
    engine: SyncEngine,
    store: Arc<RwLock<RecordStore>>,
    transfer: Arc<dyn BlobTransfer>,
    session: RwLock<SyncSession>,
    in_flight: Mutex<Option<InFlight>>,
}

/// Coordinates the record store, the merge engine and a remote store.
///
/// Cheap to clone; clones share the same gate and session.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        config: SyncConfig,
        store: Arc<RwLock<RecordStore>>,
        transfer: Arc<dyn BlobTransfer>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine: SyncEngine::new(&config),
                config,
                store,
                transfer,
                session: RwLock::new(SyncSession::new()),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.inner.engine
    }

    /// The record store this orchestrator syncs.
    pub fn store(&self) -> Arc<RwLock<RecordStore>> {
        Arc::clone(&self.inner.store)
    }

    /// A copy of the current session.
    pub async fn session(&self) -> SyncSession {
        self.inner.session.read().await.clone()
    }

    /// Whether a run is in flight.
    pub async fn is_syncing(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .await
            .as_ref()
            .is_some_and(InFlight::is_running)
    }

    /// Uploads the local snapshot unless it is unchanged since the last
    /// upload.
    pub async fn sync_up(&self) -> SyncResult<SyncReport> {
        self.run(SyncDirection::Up, SyncTrigger::Manual).await
    }

    /// Fetches the remote snapshot and merges it into the record store.
    pub async fn sync_down(&self) -> SyncResult<SyncReport> {
        self.run(SyncDirection::Down, SyncTrigger::Manual).await
    }

    /// Runs a full cycle: download and merge, then upload.
    pub async fn sync(&self) -> SyncResult<SyncReport> {
        self.run(SyncDirection::Full, SyncTrigger::Manual).await
    }

    /// Runs a sync through the gate.
    pub async fn run(&self, direction: SyncDirection, trigger: SyncTrigger) -> SyncResult<SyncReport> {
        loop {
            let mut slot = self.inner.in_flight.lock().await;

            if let Some(active) = slot.as_ref().filter(|f| f.is_running()) {
                if self.inner.config.concurrency == ConcurrencyPolicy::Reject {
                    debug!("Rejecting {} sync: {} sync in flight", direction, active.direction);
                    return Err(SyncError::ConcurrentSync {
                        active: active.direction,
                    });
                }

                let run = active.run.clone();
                let same_direction = active.direction == direction;
                drop(slot);

                let result = run.await;
                if same_direction {
                    debug!("Coalesced {} sync onto the running one", direction);
                    return result;
                }
                continue;
            }

            let in_flight = self.spawn_run(direction, trigger);
            let run = in_flight.run.clone();
            *slot = Some(in_flight);
            drop(slot);
            return run.await;
        }
    }

    fn spawn_run(&self, direction: SyncDirection, trigger: SyncTrigger) -> InFlight {
        let inner = Arc::clone(&self.inner);
        let done = Arc::new(AtomicBool::new(false));
        let guard = DoneOnDrop(Arc::clone(&done));

        let task = tokio::spawn(async move {
            let _guard = guard;
            inner.execute(direction, trigger).await
        });
        let run = async move {
            task.await
                .unwrap_or_else(|e| Err(SyncError::Aborted(e.to_string())))
        }
        .boxed()
        .shared();

        InFlight {
            direction,
            run,
            done,
        }
    }
}

impl Inner {
    async fn execute(&self, direction: SyncDirection, trigger: SyncTrigger) -> SyncResult<SyncReport> {
        let started_at = Timestamp::now();
        self.session.write().await.begin(direction);
        info!(
            "Starting {} sync ({:?}) on {} via {}",
            direction,
            trigger,
            self.config.device_name,
            self.transfer.provider_name()
        );

        let result = match direction {
            SyncDirection::Up => self.upload().await.map(|up| (None, Some(up))),
            SyncDirection::Down => self.download().await.map(|down| (Some(down), None)),
            SyncDirection::Full => match self.download().await {
                Ok(down) => self.upload().await.map(|up| (Some(down), Some(up))),
                Err(e) => Err(e),
            },
        };

        let mut session = self.session.write().await;
        match result {
            Ok((download, upload)) => {
                session.finish();
                Ok(SyncReport {
                    direction,
                    trigger,
                    download,
                    upload,
                    started_at,
                    finished_at: Timestamp::now(),
                })
            }
            Err(e) => {
                warn!("{} sync failed: {}", direction, e);
                session.fail(&e);
                Err(e)
            }
        }
    }

    async fn set_phase(&self, phase: SyncPhase) {
        debug!("Sync phase: {:?}", phase);
        self.session.write().await.phase = phase;
    }

    // ── Upload ───────────────────────────────────────────────────

    async fn upload(&self) -> SyncResult<UploadOutcome> {
        self.set_phase(SyncPhase::Snapshotting).await;
        let snapshot = {
            let store = self.store.read().await;
            self.engine.build_snapshot(&store)
        };
        let fingerprint = self.engine.detector().fingerprint(&snapshot);

        {
            let mut session = self.session.write().await;
            if session.last_uploaded_fingerprint.as_ref() == Some(&fingerprint) {
                debug!("Snapshot {} already uploaded, skipping", fingerprint);
                session.phase = SyncPhase::Skipped;
                session.uploads_skipped += 1;
                return Ok(UploadOutcome::Skipped { fingerprint });
            }
        }

        self.set_phase(SyncPhase::Transmitting).await;
        let payload = serde_json::to_value(&snapshot)?;
        self.transfer
            .upload_blob(&self.config.consolidated_key, &payload)
            .await?;

        let mut legacy_objects = 0;
        if self.config.write_legacy_layout {
            for (name, records) in &snapshot.collections {
                self.transfer
                    .upload_blob(&self.config.legacy_key(name), &Value::Array(records.clone()))
                    .await?;
                legacy_objects += 1;
            }
        }

        let records = snapshot.record_count();
        {
            let mut session = self.session.write().await;
            session.last_uploaded_fingerprint = Some(fingerprint.clone());
            session.last_upload_at = Some(Timestamp::now());
            session.uploads += 1;
        }
        info!(
            "Uploaded snapshot {} ({} records) to {}",
            fingerprint,
            records,
            self.transfer.provider_name()
        );

        Ok(UploadOutcome::Uploaded {
            fingerprint,
            records,
            legacy_objects,
        })
    }

    // ── Download ─────────────────────────────────────────────────

    async fn download(&self) -> SyncResult<DownloadOutcome> {
        self.set_phase(SyncPhase::Fetching).await;
        let (remote, source) = self.fetch_remote().await?;
        let remote_fingerprint = self.engine.detector().fingerprint(&remote);

        self.set_phase(SyncPhase::Merging).await;
        let mut store = self.store.write().await;
        let local_before = self.engine.local_fingerprint(&store);

        {
            let mut session = self.session.write().await;
            let unchanged = session.last_merged_remote_fingerprint.as_ref() == Some(&remote_fingerprint)
                && session.last_merged_local_fingerprint.as_ref() == Some(&local_before);
            if unchanged {
                debug!("Remote {} already merged, skipping", remote_fingerprint);
                session.downloads_skipped += 1;
                return Ok(DownloadOutcome {
                    source,
                    remote_fingerprint,
                    skipped: true,
                    collections: Default::default(),
                    tombstones_added: 0,
                    collections_written: 0,
                    tombstones_pruned: 0,
                });
            }
        }

        let merge = self.engine.merge_snapshot(&store, &remote);
        let collections = merge
            .collections
            .iter()
            .map(|c| (c.collection.clone(), c.stats.clone()))
            .collect();
        let tombstones_added = merge.tombstones_added;

        self.set_phase(SyncPhase::Writing).await;
        let write_back = self.engine.apply(&mut store, merge)?;
        let local_after = self.engine.local_fingerprint(&store);
        drop(store);

        {
            let mut session = self.session.write().await;
            if source == RemoteSource::Consolidated && local_after == remote_fingerprint {
                // The remote already holds exactly our data.
                session.last_uploaded_fingerprint = Some(remote_fingerprint.clone());
            }
            session.last_merged_remote_fingerprint = Some(remote_fingerprint.clone());
            session.last_merged_local_fingerprint = Some(local_after);
            session.last_download_at = Some(Timestamp::now());
            session.downloads += 1;
        }

        Ok(DownloadOutcome {
            source,
            remote_fingerprint,
            skipped: false,
            collections,
            tombstones_added,
            collections_written: write_back.collections_written,
            tombstones_pruned: write_back.tombstones_pruned,
        })
    }

    async fn fetch_remote(&self) -> SyncResult<(ConsolidatedSnapshot, RemoteSource)> {
        let key = &self.config.consolidated_key;
        match self.transfer.download_blob(key).await {
            Ok(value) => {
                let snapshot = serde_json::from_value(value)
                    .map_err(|e| SyncError::MalformedSnapshot(e.to_string()))?;
                Ok((snapshot, RemoteSource::Consolidated))
            }
            Err(e) if e.is_not_found() && self.config.legacy_fallback => {
                debug!("No snapshot at {}, trying the legacy layout", key);
                self.fetch_legacy().await
            }
            Err(e) if e.is_not_found() => {
                info!("No snapshot at {}, treating the remote as empty", key);
                Ok((ConsolidatedSnapshot::empty(), RemoteSource::Absent))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_legacy(&self) -> SyncResult<(ConsolidatedSnapshot, RemoteSource)> {
        let mut names: BTreeSet<String> = self.engine.registry().names().map(str::to_string).collect();
        names.extend(self.store.read().await.collection_names());

        let mut snapshot = ConsolidatedSnapshot::empty();
        for name in names {
            let key = self.config.legacy_key(&name);
            match self.transfer.download_blob(&key).await {
                Ok(Value::Array(records)) => {
                    snapshot.collections.insert(name, records);
                }
                Ok(_) => warn!("Legacy object {} is not an array, ignoring it", key),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        if snapshot.collections.is_empty() {
            info!("No remote data found, treating the remote as empty");
            return Ok((snapshot, RemoteSource::Absent));
        }
        info!("Read {} collections from the legacy layout", snapshot.collections.len());
        Ok((snapshot, RemoteSource::Legacy))
    }
}

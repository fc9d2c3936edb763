//! Automatic sync: a periodic full cycle plus a debounced upload after
//! local writes.
//!
//! Both go through the orchestrator's gate, so they never overlap with each
//! other or with manual runs. Failures are logged and left for the next
//! trigger; nothing is retried.

use crate::error::{SyncError, SyncResult};
use crate::orchestrator::SyncOrchestrator;
use crate::state::{SyncDirection, SyncTrigger};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 64;

/// Messages to the auto-sync task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AutoSyncCommand {
    WriteNotified,
    Shutdown,
}

/// Handle to a running auto-sync task.
pub struct AutoSyncHandle {
    commands: mpsc::Sender<AutoSyncCommand>,
    task: JoinHandle<()>,
}

impl AutoSyncHandle {
    /// Reports a local write. The upload starts once writes have been quiet
    /// for the configured debounce period.
    pub fn notify_write(&self) -> SyncResult<()> {
        match self.commands.try_send(AutoSyncCommand::WriteNotified) {
            // A full buffer already holds a pending write notification.
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SyncError::ChannelClosed),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the task, letting a run in progress finish first.
    pub async fn shutdown(self) -> SyncResult<()> {
        // The task may already be gone; joining below reports that.
        let _ = self.commands.send(AutoSyncCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| SyncError::Aborted(e.to_string()))
    }
}

impl SyncOrchestrator {
    /// Starts the auto-sync task on the current tokio runtime.
    pub fn start_auto_sync(&self) -> AutoSyncHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let config = self.config();
        let interval = Duration::from_secs(config.auto_sync_interval_secs);
        let debounce = Duration::from_millis(config.write_debounce_ms);
        let task = tokio::spawn(auto_sync_loop(self.clone(), rx, interval, debounce));
        info!(
            "Auto-sync started (interval {:?}, debounce {:?})",
            interval, debounce
        );
        AutoSyncHandle { commands: tx, task }
    }
}

async fn auto_sync_loop(
    orchestrator: SyncOrchestrator,
    mut commands: mpsc::Receiver<AutoSyncCommand>,
    interval: Duration,
    debounce: Duration,
) {
    let mut ticker = (!interval.is_zero()).then(|| {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    let mut upload_at: Option<Instant> = None;

    loop {
        let deadline = upload_at.unwrap_or_else(|| Instant::now() + debounce);
        tokio::select! {
            command = commands.recv() => match command {
                Some(AutoSyncCommand::WriteNotified) => {
                    upload_at = Some(Instant::now() + debounce);
                }
                Some(AutoSyncCommand::Shutdown) | None => break,
            },
            _ = next_tick(&mut ticker) => {
                run_logged(&orchestrator, SyncDirection::Full, SyncTrigger::Periodic).await;
            }
            _ = time::sleep_until(deadline), if upload_at.is_some() => {
                upload_at = None;
                run_logged(&orchestrator, SyncDirection::Up, SyncTrigger::OnWrite).await;
            }
        }
    }
    debug!("Auto-sync stopped");
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run_logged(orchestrator: &SyncOrchestrator, direction: SyncDirection, trigger: SyncTrigger) {
    if let Err(e) = orchestrator.run(direction, trigger).await {
        warn!("Automatic {} sync failed: {}", direction, e);
    }
}

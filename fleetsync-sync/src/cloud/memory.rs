//! In-memory transport for tests and offline demos.

use super::storage::{BlobTransfer, TransferError, TransferResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Keeps blobs in a map and counts every call.
///
/// Failures can be queued with [`MemoryTransfer::fail_next`]; each queued
/// error is returned by exactly one upload or download.
#[derive(Debug, Default)]
pub struct MemoryTransfer {
    blobs: Mutex<BTreeMap<String, Value>>,
    failures: Mutex<VecDeque<TransferError>>,
    latency: Mutex<Option<Duration>>,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
}

fn poisoned<E>(_: E) -> TransferError {
    TransferError::Storage("memory transfer lock poisoned".to_string())
}

impl MemoryTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a blob without counting an upload.
    pub fn insert(&self, key: &str, value: Value) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(key.to_string(), value);
        }
    }

    /// Returns the blob stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.blobs.lock().ok()?.get(key).cloned()
    }

    /// Keys of every stored blob, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.blobs
            .lock()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Queues an error for the next call.
    pub fn fail_next(&self, error: TransferError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    /// Makes every call wait before completing.
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut slot) = self.latency.lock() {
            *slot = Some(latency);
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> TransferResult<()> {
        let latency = *self.latency.lock().map_err(poisoned)?;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.failures.lock().map_err(poisoned)?.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlobTransfer for MemoryTransfer {
    fn provider_name(&self) -> &'static str {
        "Memory"
    }

    async fn upload_blob(&self, key: &str, payload: &Value) -> TransferResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.blobs
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), payload.clone());
        Ok(())
    }

    async fn download_blob(&self, key: &str) -> TransferResult<Value> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.blobs
            .lock()
            .map_err(poisoned)?
            .get(key)
            .cloned()
            .ok_or_else(|| TransferError::NotFound(key.to_string()))
    }
}

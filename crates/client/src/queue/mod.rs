//! Durable offline queue.
//!
//! Entries are kept in enqueue order and removed only after the server
//! acknowledges them. [`OfflineQueue::drain`] replays from the head and halts
//! at the first failure, so an entry is never sent before the ones queued
//! ahead of it.

mod file;
mod memory;

pub use file::FileQueueStore;
pub use memory::MemoryQueueStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ClientError;
use crate::http::Submitter;
use crate::operation::PendingOperation;

/// Message shown when a drain halts with entries left.
pub const RETRY_LATER: &str = "will retry when back online";

/// One deferred operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub operation: String,
    #[serde(alias = "payload")]
    pub data: Value,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(op: &PendingOperation) -> Result<Self, ClientError> {
        let (entry_type, operation) = op.kind();
        Ok(Self {
            id: Uuid::new_v4(),
            entry_type: entry_type.to_string(),
            operation: operation.to_string(),
            data: op.data()?,
            enqueued_at: Utc::now(),
        })
    }
}

/// Durable backing for an [`OfflineQueue`].
///
/// `save` replaces the whole stored queue and must be atomic: after a crash
/// the store holds either the old or the new list.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn load(&self) -> Result<Vec<QueueEntry>, ClientError>;

    async fn save(&self, entries: &[QueueEntry]) -> Result<(), ClientError>;
}

/// Result of one drain pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// Entries sent and acknowledged in this pass.
    pub submitted: usize,
    /// Entries still queued after the pass.
    pub remaining: usize,
    /// The entry that failed and stopped the pass.
    pub halted: Option<DrainHalt>,
    /// The pass stopped because it was cancelled.
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrainHalt {
    pub entry_id: Uuid,
    pub error: String,
}

impl DrainReport {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Status line for the user.
    pub fn summary(&self) -> String {
        if self.is_complete() {
            format!("{} queued operation(s) synced", self.submitted)
        } else {
            format!(
                "{} synced, {} pending; {RETRY_LATER}",
                self.submitted, self.remaining
            )
        }
    }
}

/// In-order queue of operations waiting for the server.
pub struct OfflineQueue<S> {
    store: S,
    entries: Mutex<Vec<QueueEntry>>,
    drain_lock: Mutex<()>,
}

impl<S: QueueStore> OfflineQueue<S> {
    /// Open the queue, loading whatever the store holds.
    pub async fn open(store: S) -> Result<Self, ClientError> {
        let mut entries = store.load().await?;
        entries.sort_by_key(|e| e.enqueued_at);
        if !entries.is_empty() {
            tracing::info!(pending = entries.len(), "Offline queue loaded");
        }
        Ok(Self {
            store,
            entries: Mutex::new(entries),
            drain_lock: Mutex::new(()),
        })
    }

    /// Append an entry and persist it before returning.
    pub async fn enqueue(&self, entry: QueueEntry) -> Result<(), ClientError> {
        let mut entries = self.entries.lock().await;
        entries.push(entry);
        if let Err(e) = self.store.save(&entries).await {
            entries.pop();
            return Err(e);
        }
        if let Some(entry) = entries.last() {
            tracing::info!(
                entry_id = %entry.id,
                entry_type = %entry.entry_type,
                operation = %entry.operation,
                pending = entries.len(),
                "Operation queued offline"
            );
        }
        Ok(())
    }

    /// Queue `op`, returning the new entry's id.
    pub async fn enqueue_operation(&self, op: &PendingOperation) -> Result<Uuid, ClientError> {
        let entry = QueueEntry::new(op)?;
        let id = entry.id;
        self.enqueue(entry).await?;
        Ok(id)
    }

    /// Oldest entry, if any.
    pub async fn peek(&self) -> Option<QueueEntry> {
        self.entries.lock().await.first().cloned()
    }

    /// Remove the head entry after the server accepted it.
    pub async fn ack(&self, id: Uuid) -> Result<(), ClientError> {
        let mut entries = self.entries.lock().await;
        if entries.first().map(|e| e.id) != Some(id) {
            return Err(ClientError::NotAtHead(id));
        }
        let removed = entries.remove(0);
        if let Err(e) = self.store.save(&entries).await {
            entries.insert(0, removed);
            return Err(e);
        }
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Hold off drains until the guard is dropped, waiting for a running
    /// drain to finish first.
    ///
    /// Callers that check [`is_empty`](Self::is_empty) and then send
    /// directly hold this guard so a drain cannot interleave.
    pub async fn pause_drain(&self) -> MutexGuard<'_, ()> {
        self.drain_lock.lock().await
    }

    /// Snapshot of the queued entries, oldest first.
    pub async fn entries(&self) -> Vec<QueueEntry> {
        self.entries.lock().await.clone()
    }

    /// Send queued entries in order until the queue is empty, an entry
    /// fails, or `cancel` fires.
    ///
    /// Cancellation is checked between entries; an entry already sent is
    /// acknowledged before the pass stops.
    pub async fn drain<T>(
        &self,
        submitter: &T,
        cancel: &CancellationToken,
    ) -> Result<DrainReport, ClientError>
    where
        T: Submitter + ?Sized,
    {
        let _guard = self
            .drain_lock
            .try_lock()
            .map_err(|_| ClientError::DrainInProgress)?;

        let mut report = DrainReport::default();
        loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(entry) = self.peek().await else {
                break;
            };

            match submitter.submit(&entry).await {
                Ok(()) => {
                    self.ack(entry.id).await?;
                    report.submitted += 1;
                    tracing::debug!(entry_id = %entry.id, "Queued operation delivered");
                }
                Err(e) => {
                    tracing::warn!(
                        entry_id = %entry.id,
                        entry_type = %entry.entry_type,
                        operation = %entry.operation,
                        error = %e,
                        "Offline replay halted; {RETRY_LATER}"
                    );
                    report.halted = Some(DrainHalt {
                        entry_id: entry.id,
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        report.remaining = self.len().await;
        if report.submitted > 0 || report.halted.is_some() {
            tracing::info!(
                submitted = report.submitted,
                remaining = report.remaining,
                cancelled = report.cancelled,
                "Offline queue drained"
            );
        }
        Ok(report)
    }
}

//! Online-first client with offline fallback.

use fleet_core::checklist::ChecklistGate;
use fleet_core::inspection::SubmitInspection;
use fleet_core::submission::SubmissionResult;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::ApiClient;
use crate::operation::PendingOperation;
use crate::queue::{DrainReport, FileQueueStore, OfflineQueue, QueueStore};

/// How an inspection submission was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum InspectionDelivery {
    /// The server saved it.
    Submitted(SubmissionResult),
    /// The server was unreachable or other operations were waiting; the
    /// submission will be sent by the next drain.
    Queued { entry_id: Uuid, client_ref: Uuid },
}

/// How any other operation was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Queued { entry_id: Uuid },
}

/// Client used by the inspection UI.
///
/// Operations go straight to the server while it is reachable. When it is
/// not, or when earlier operations are still queued, they are queued so the
/// server sees them in the order they were made. A direct send waits for a
/// running drain and keeps new drains out until it has been sent or queued.
pub struct FleetClient<S> {
    api: ApiClient,
    queue: OfflineQueue<S>,
}

impl FleetClient<FileQueueStore> {
    /// Client with a file-backed queue, both taken from `config`.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let api = ApiClient::new(config)?;
        let queue = OfflineQueue::open(FileQueueStore::new(&config.queue_path)).await?;
        Ok(Self::new(api, queue))
    }
}

impl<S: QueueStore> FleetClient<S> {
    pub fn new(api: ApiClient, queue: OfflineQueue<S>) -> Self {
        Self { api, queue }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn queue(&self) -> &OfflineQueue<S> {
        &self.queue
    }

    /// Submit an inspection, queueing it when the server cannot be reached.
    ///
    /// A `client_ref` is assigned if missing so a replay after a lost
    /// response does not create a second inspection.
    pub async fn submit_inspection(
        &self,
        mut submission: SubmitInspection,
    ) -> Result<InspectionDelivery, ClientError> {
        let client_ref = *submission.client_ref.get_or_insert_with(Uuid::new_v4);

        let _paused = self.queue.pause_drain().await;
        if self.queue.is_empty().await {
            match self.api.submit_inspection(&submission).await {
                Ok(result) => return Ok(InspectionDelivery::Submitted(result)),
                Err(e) if e.is_offline() => {
                    tracing::warn!(
                        asset_id = %submission.asset_id,
                        error = %e,
                        "Server unreachable, queueing inspection"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let entry_id = self
            .queue
            .enqueue_operation(&PendingOperation::SubmitInspection(submission))
            .await?;
        Ok(InspectionDelivery::Queued {
            entry_id,
            client_ref,
        })
    }

    /// Send an operation, queueing it when the server cannot be reached.
    pub async fn perform(&self, op: PendingOperation) -> Result<Delivery, ClientError> {
        let _paused = self.queue.pause_drain().await;
        if self.queue.is_empty().await {
            match self.api.execute(&op).await {
                Ok(()) => return Ok(Delivery::Sent),
                Err(e) if e.is_offline() => {
                    let (entry_type, operation) = op.kind();
                    tracing::warn!(
                        entry_type,
                        operation,
                        error = %e,
                        "Server unreachable, queueing operation"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let entry_id = self.queue.enqueue_operation(&op).await?;
        Ok(Delivery::Queued { entry_id })
    }

    /// Load the open defects of `asset_id` for a new checklist.
    ///
    /// A failed lookup yields a blocked gate instead of an error.
    pub async fn fetch_checklist_gate(&self, asset_id: &str) -> ChecklistGate {
        ChecklistGate::from_lookup(asset_id, self.api.locked_defects(asset_id).await)
    }

    /// Replay queued operations in order.
    pub async fn sync_pending(&self, cancel: &CancellationToken) -> Result<DrainReport, ClientError> {
        self.queue.drain(&self.api, cancel).await
    }
}

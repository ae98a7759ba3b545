//! Action synchronizer.
//!
//! Reconciles the defects extracted from one inspection against the open
//! actions of the asset. A defect that already has an open action is
//! attached to it; otherwise a new `pending` action is raised. Running the
//! same batch again only ever attaches, even after the action was closed:
//! an inspection item already recorded on an action never raises another.

use serde::{Deserialize, Serialize};

use crate::action::{NewAction, NewOccurrence};
use crate::defects::DefectDescriptor;
use crate::error::CoreError;
use crate::inspection::DefectKey;
use crate::store::{ActionStore, InsertOutcome, StoreError};
use crate::types::DbId;

/// Attempts per descriptor when the matching action changes under us.
const MAX_SYNC_ATTEMPTS: usize = 3;

/// Request body of the sync-defects operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub inspection_id: DbId,
    pub asset_id: String,
    pub created_by: DbId,
    pub defects: Vec<DefectDescriptor>,
}

/// Outcome of one synchronizer run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub created_count: usize,
    pub attached_count: usize,
    /// One message per descriptor that could not be synced.
    pub errors: Vec<String>,
}

impl SyncOutcome {
    /// `true` when at least one descriptor failed and a retry is needed.
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// What happened to a single descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDisposition {
    Created(DbId),
    Attached(DbId),
    /// The item is already an occurrence of this action, which is closed.
    AlreadyRecorded(DbId),
}

/// Reconciles defect descriptors against the open actions in a store.
pub struct ActionSynchronizer<'a, S: ActionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ActionStore + ?Sized> ActionSynchronizer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Sync every descriptor of `request`, sequentially.
    ///
    /// A failing descriptor is recorded in [`SyncOutcome::errors`] and does
    /// not stop the others.
    pub async fn sync(&self, request: &SyncRequest) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        for defect in &request.defects {
            match self.sync_one(request, defect).await {
                Ok(SyncDisposition::Created(action_id)) => {
                    outcome.created_count += 1;
                    tracing::info!(
                        action_id,
                        asset_id = %request.asset_id,
                        inspection_id = request.inspection_id,
                        item_number = defect.item_number,
                        "Action created for defect"
                    );
                }
                Ok(SyncDisposition::Attached(action_id)) => {
                    outcome.attached_count += 1;
                    tracing::debug!(
                        action_id,
                        asset_id = %request.asset_id,
                        inspection_id = request.inspection_id,
                        item_number = defect.item_number,
                        "Defect attached to open action"
                    );
                }
                Ok(SyncDisposition::AlreadyRecorded(action_id)) => {
                    outcome.attached_count += 1;
                    tracing::debug!(
                        action_id,
                        asset_id = %request.asset_id,
                        inspection_id = request.inspection_id,
                        item_number = defect.item_number,
                        "Defect already recorded on a closed action"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        asset_id = %request.asset_id,
                        inspection_id = request.inspection_id,
                        item_number = defect.item_number,
                        "Defect sync failed"
                    );
                    outcome.errors.push(format!(
                        "Item {} ({}): {e}",
                        defect.item_number, defect.item_description
                    ));
                }
            }
        }

        outcome
    }

    /// Sync a single descriptor.
    pub async fn sync_one(
        &self,
        request: &SyncRequest,
        defect: &DefectDescriptor,
    ) -> Result<SyncDisposition, CoreError> {
        let key = DefectKey::new(&request.asset_id, defect.item_number, &defect.item_description);
        if key.asset_id.is_empty() || key.item_description.is_empty() {
            return Err(CoreError::Validation(
                "Defect is missing its asset or item description".to_string(),
            ));
        }

        let occurrence = NewOccurrence {
            inspection_id: request.inspection_id,
            inspection_item_id: defect.primary_inspection_item_id,
        };

        if let Some(recorded) = self
            .store
            .find_action_for_item(defect.primary_inspection_item_id)
            .await?
        {
            if !recorded.is_open() {
                return Ok(SyncDisposition::AlreadyRecorded(recorded.id));
            }
        }

        for _ in 0..MAX_SYNC_ATTEMPTS {
            let existing = match self.store.find_open_action(&key).await? {
                Some(action) => action,
                None => {
                    let new = NewAction::from_defect(
                        &request.asset_id,
                        request.inspection_id,
                        request.created_by,
                        defect,
                    );
                    match self.store.insert_open_action(&new).await? {
                        InsertOutcome::Created(action) => {
                            return Ok(SyncDisposition::Created(action.id))
                        }
                        // Lost the race to a concurrent writer.
                        InsertOutcome::Existing(action) => action,
                    }
                }
            };

            if let Some(action) = self.store.attach_occurrence(existing.id, &occurrence).await? {
                return Ok(SyncDisposition::Attached(action.id));
            }
            // The action was closed or deleted between lookup and attach.
        }

        Err(StoreError::Conflict(format!(
            "open action for item {} kept changing during sync",
            key.item_number
        ))
        .into())
    }
}

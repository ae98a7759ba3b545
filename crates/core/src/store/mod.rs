//! Persistence seams of the engine.
//!
//! [`ActionStore`] and [`InspectionStore`] are implemented by the Postgres
//! store in `fleet-db` and by [`MemoryStore`] (tests and local runs). Every
//! write that the invariants depend on is a single store call, so a backend
//! can make it atomic.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionOccurrence, ActionStatus, NewAction, NewOccurrence};
use crate::error::CoreError;
use crate::inspection::{DefectKey, NewInspection, StoredInspection};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure reported by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached; the operation may be retried.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// A stored row could not be converted into a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Any other backend failure.
    #[error("Store error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => CoreError::Conflict(msg),
            StoreError::Unavailable(msg) => CoreError::Unavailable(msg),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Store DTOs
// ---------------------------------------------------------------------------

/// Result of inserting an open action for a defect key.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// A new pending action was created.
    Created(Action),
    /// An open action already held the key; nothing was inserted.
    Existing(Action),
}

/// Result of saving an inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedInspection {
    pub stored: StoredInspection,
    /// `true` when the `client_ref` matched an inspection saved earlier.
    pub replayed: bool,
}

/// Filter for listing actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFilter {
    pub asset_id: Option<String>,
    pub status: Option<ActionStatus>,
}

impl ActionFilter {
    pub fn matches(&self, action: &Action) -> bool {
        self.asset_id
            .as_deref()
            .map_or(true, |asset| action.asset_id == asset)
            && self.status.map_or(true, |status| action.status == status)
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Persistence for remediation actions.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Liveness check used by the health endpoint.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Actions of `asset_id` whose status is pending or logged.
    async fn list_open_actions(&self, asset_id: &str) -> Result<Vec<Action>, StoreError>;

    /// The open action holding `key`, if any.
    async fn find_open_action(&self, key: &DefectKey) -> Result<Option<Action>, StoreError>;

    async fn list_actions(&self, filter: &ActionFilter) -> Result<Vec<Action>, StoreError>;

    async fn get_action(&self, id: DbId) -> Result<Option<Action>, StoreError>;

    /// The action that already records `inspection_item_id` as an
    /// occurrence, whatever its status. The newest one wins if several do.
    async fn find_action_for_item(
        &self,
        inspection_item_id: DbId,
    ) -> Result<Option<Action>, StoreError>;

    /// Insert a pending action and its first occurrence, unless an open
    /// action already holds the same defect key.
    ///
    /// Implementations must make the check and the insert atomic.
    async fn insert_open_action(&self, new: &NewAction) -> Result<InsertOutcome, StoreError>;

    /// Point an open action at a newer inspection item and record the
    /// occurrence (once per inspection item).
    ///
    /// Returns `None` when the action no longer exists or is no longer open.
    async fn attach_occurrence(
        &self,
        action_id: DbId,
        occurrence: &NewOccurrence,
    ) -> Result<Option<Action>, StoreError>;

    /// Occurrences of an action, oldest first.
    async fn list_occurrences(&self, action_id: DbId)
        -> Result<Vec<ActionOccurrence>, StoreError>;

    /// Persist a transitioned action if its status is still `expected`.
    ///
    /// Returns `None` when the row is gone or its status changed in the
    /// meantime. Reopening an action whose key is already held by another
    /// open action fails with [`StoreError::Conflict`].
    async fn save_transition(
        &self,
        next: &Action,
        expected: ActionStatus,
    ) -> Result<Option<Action>, StoreError>;

    /// Delete an action. Returns `false` if it did not exist.
    async fn delete_action(&self, id: DbId) -> Result<bool, StoreError>;
}

/// Persistence for inspections and their checklist items.
#[async_trait]
pub trait InspectionStore: Send + Sync {
    /// Save an inspection and its items in one unit.
    ///
    /// A submission whose `client_ref` was saved before returns the earlier
    /// inspection with `replayed = true` and writes nothing.
    async fn save_inspection(&self, new: &NewInspection) -> Result<SavedInspection, StoreError>;

    async fn get_inspection(&self, id: DbId) -> Result<Option<StoredInspection>, StoreError>;
}

/// A backend providing both stores.
pub trait FleetStore: ActionStore + InspectionStore {}

impl<T: ActionStore + InspectionStore + ?Sized> FleetStore for T {}

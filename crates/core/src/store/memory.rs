//! In-memory implementation of the store traits.
//!
//! All state sits behind one mutex, so every trait call is atomic. The open
//! defect-key check in [`ActionStore::insert_open_action`] and
//! [`ActionStore::save_transition`] mirrors the partial unique index used by
//! the Postgres schema.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{
    ActionFilter, ActionStore, InsertOutcome, InspectionStore, SavedInspection, StoreError,
};
use crate::action::{Action, ActionOccurrence, ActionStatus, NewAction, NewOccurrence};
use crate::inspection::{DefectKey, Inspection, InspectionItem, NewInspection, StoredInspection};
use crate::types::DbId;

#[derive(Debug, Default)]
struct MemoryState {
    next_id: DbId,
    actions: BTreeMap<DbId, Action>,
    occurrences: Vec<ActionOccurrence>,
    inspections: BTreeMap<DbId, Inspection>,
    items: BTreeMap<DbId, InspectionItem>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn open_action_for(&self, key: &DefectKey) -> Option<&Action> {
        self.actions
            .values()
            .find(|a| a.is_open() && a.defect_key() == *key)
    }

    fn record_occurrence(&mut self, action_id: DbId, occurrence: &NewOccurrence) {
        let exists = self.occurrences.iter().any(|o| {
            o.action_id == action_id && o.inspection_item_id == occurrence.inspection_item_id
        });
        if !exists {
            let id = self.next_id();
            self.occurrences.push(ActionOccurrence {
                id,
                action_id,
                inspection_id: occurrence.inspection_id,
                inspection_item_id: occurrence.inspection_item_id,
                created_at: Utc::now(),
            });
        }
    }

    fn stored_inspection(&self, inspection: &Inspection) -> StoredInspection {
        let mut items: Vec<InspectionItem> = self
            .items
            .values()
            .filter(|i| i.inspection_id == inspection.id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.day_of_week, i.item_number));
        StoredInspection {
            inspection: inspection.clone(),
            items,
        }
    }
}

/// Process-local store used by tests and local development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    actions_unavailable: AtomicBool,
    action_writes_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every [`ActionStore`] call fail with [`StoreError::Unavailable`]
    /// while `unavailable` is set. Inspection writes keep working.
    pub fn set_actions_unavailable(&self, unavailable: bool) {
        self.actions_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only the [`ActionStore`] writes fail while `unavailable` is set.
    /// Reads, including the lock registry lookup, keep working.
    pub fn set_action_writes_unavailable(&self, unavailable: bool) {
        self.action_writes_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        self.check_available()?;
        if self.action_writes_unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "action store is read-only".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.actions_unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "action store is unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ActionStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn list_open_actions(&self, asset_id: &str) -> Result<Vec<Action>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .actions
            .values()
            .filter(|a| a.is_open() && a.asset_id == asset_id)
            .cloned()
            .collect())
    }

    async fn find_open_action(&self, key: &DefectKey) -> Result<Option<Action>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.open_action_for(key).cloned())
    }

    async fn list_actions(&self, filter: &ActionFilter) -> Result<Vec<Action>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .actions
            .values()
            .rev()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn get_action(&self, id: DbId) -> Result<Option<Action>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.actions.get(&id).cloned())
    }

    async fn find_action_for_item(
        &self,
        inspection_item_id: DbId,
    ) -> Result<Option<Action>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .occurrences
            .iter()
            .filter(|o| o.inspection_item_id == inspection_item_id)
            .map(|o| o.action_id)
            .max()
            .and_then(|id| state.actions.get(&id))
            .cloned())
    }

    async fn insert_open_action(&self, new: &NewAction) -> Result<InsertOutcome, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        if let Some(existing) = state.open_action_for(&new.defect_key()) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        let id = state.next_id();
        let now = Utc::now();
        let action = Action {
            id,
            asset_id: new.asset_id.clone(),
            inspection_id: Some(new.inspection_id),
            inspection_item_id: Some(new.inspection_item_id),
            item_number: new.item_number,
            item_description: new.item_description.clone(),
            title: new.title.clone(),
            description: new.description.clone(),
            defect_comment: new.defect_comment.clone(),
            priority: new.priority,
            status: ActionStatus::Pending,
            status_before_completion: None,
            logged_comment: None,
            logged_at: None,
            logged_by: None,
            actioned_at: None,
            actioned_by: None,
            created_at: now,
            created_by: new.created_by,
            updated_at: now,
        };
        state.actions.insert(id, action.clone());
        state.record_occurrence(
            id,
            &NewOccurrence {
                inspection_id: new.inspection_id,
                inspection_item_id: new.inspection_item_id,
            },
        );
        Ok(InsertOutcome::Created(action))
    }

    async fn attach_occurrence(
        &self,
        action_id: DbId,
        occurrence: &NewOccurrence,
    ) -> Result<Option<Action>, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        let Some(action) = state.actions.get_mut(&action_id).filter(|a| a.is_open()) else {
            return Ok(None);
        };
        action.inspection_id = Some(occurrence.inspection_id);
        action.inspection_item_id = Some(occurrence.inspection_item_id);
        action.updated_at = Utc::now();
        let updated = action.clone();

        state.record_occurrence(action_id, occurrence);
        Ok(Some(updated))
    }

    async fn list_occurrences(
        &self,
        action_id: DbId,
    ) -> Result<Vec<ActionOccurrence>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .occurrences
            .iter()
            .filter(|o| o.action_id == action_id)
            .cloned()
            .collect())
    }

    async fn save_transition(
        &self,
        next: &Action,
        expected: ActionStatus,
    ) -> Result<Option<Action>, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        match state.actions.get(&next.id) {
            Some(current) if current.status == expected => {}
            _ => return Ok(None),
        }

        if next.is_open() && !expected.is_open() {
            let key = next.defect_key();
            if let Some(holder) = state.open_action_for(&key) {
                return Err(StoreError::Conflict(format!(
                    "uq_actions_open_defect: action {} already holds this defect",
                    holder.id
                )));
            }
        }

        state.actions.insert(next.id, next.clone());
        Ok(Some(next.clone()))
    }

    async fn delete_action(&self, id: DbId) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let removed = state.actions.remove(&id).is_some();
        state.occurrences.retain(|o| o.action_id != id);
        Ok(removed)
    }
}

#[async_trait]
impl InspectionStore for MemoryStore {
    async fn save_inspection(&self, new: &NewInspection) -> Result<SavedInspection, StoreError> {
        let mut state = self.state.lock().await;

        if let Some(client_ref) = new.client_ref {
            let earlier = state
                .inspections
                .values()
                .find(|i| i.client_ref == Some(client_ref))
                .cloned();
            if let Some(inspection) = earlier {
                return Ok(SavedInspection {
                    stored: state.stored_inspection(&inspection),
                    replayed: true,
                });
            }
        }

        let now = Utc::now();
        let inspection = Inspection {
            id: state.next_id(),
            asset_id: new.asset_id.clone(),
            inspector_id: new.inspector_id,
            week_ending: new.week_ending,
            client_ref: new.client_ref,
            created_at: now,
            updated_at: now,
        };

        for item in &new.items {
            let id = state.next_id();
            state.items.insert(
                id,
                InspectionItem {
                    id,
                    inspection_id: inspection.id,
                    asset_id: new.asset_id.clone(),
                    item_number: item.item_number,
                    item_description: item.item_description.clone(),
                    day_of_week: item.day_of_week,
                    status: item.status,
                    comment: item.comment.clone(),
                    photo_ref: item.photo_ref.clone(),
                    created_at: now,
                },
            );
        }
        state.inspections.insert(inspection.id, inspection.clone());

        Ok(SavedInspection {
            stored: state.stored_inspection(&inspection),
            replayed: false,
        })
    }

    async fn get_inspection(&self, id: DbId) -> Result<Option<StoredInspection>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .inspections
            .get(&id)
            .map(|inspection| state.stored_inspection(inspection)))
    }
}

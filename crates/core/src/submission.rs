//! Inspection submission pipeline.
//!
//! Validate, re-apply defect locks, save, then extract defects and sync them
//! into actions. The save is the commit point: a failed sync is reported in
//! the result and can be retried with [`resync`], it never undoes the save.
//!
//! Locks are enforced before anything is written. If the open defects of the
//! asset cannot be read the submission fails with nothing saved, so the
//! client keeps it queued and retries.

use serde::{Deserialize, Serialize};

use crate::defects::extract_defects;
use crate::error::CoreError;
use crate::inspection::{CellKey, Inspection, InspectionItem, SubmitInspection};
use crate::lock_registry::load_registry;
use crate::store::FleetStore;
use crate::sync::{ActionSynchronizer, SyncOutcome, SyncRequest};
use crate::types::DbId;

/// Result of submitting an inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub inspection: Inspection,
    pub items: Vec<InspectionItem>,
    pub sync: SyncOutcome,
    /// Cells forced back to `defect` because their item is locked.
    pub coerced_cells: Vec<CellKey>,
    /// `true` when the submission repeated an earlier `client_ref`.
    pub replayed: bool,
}

/// Save a submitted inspection and sync its defects into actions.
pub async fn submit_inspection<S>(
    store: &S,
    submission: SubmitInspection,
) -> Result<SubmissionResult, CoreError>
where
    S: FleetStore + ?Sized,
{
    let mut new = submission.prepare()?;

    let registry = load_registry(store, &new.asset_id).await.map_err(|e| {
        tracing::warn!(
            asset_id = %new.asset_id,
            error = %e,
            "Open defects unavailable, inspection not saved"
        );
        CoreError::from(e)
    })?;
    let coerced = registry.enforce(&mut new.items);

    let saved = store.save_inspection(&new).await?;
    let inspection = saved.stored.inspection;
    let items = saved.stored.items;

    if saved.replayed {
        tracing::info!(
            inspection_id = inspection.id,
            asset_id = %inspection.asset_id,
            "Inspection submission replayed"
        );
    } else {
        if !coerced.is_empty() {
            tracing::warn!(
                inspection_id = inspection.id,
                asset_id = %inspection.asset_id,
                cells = coerced.len(),
                "Locked checklist items were resubmitted as editable and have been restored"
            );
        }
        tracing::info!(
            inspection_id = inspection.id,
            asset_id = %inspection.asset_id,
            items = items.len(),
            "Inspection saved"
        );
    }

    let sync = sync_items(store, &inspection, &items, inspection.inspector_id).await;

    Ok(SubmissionResult {
        coerced_cells: if saved.replayed { Vec::new() } else { coerced },
        replayed: saved.replayed,
        inspection,
        items,
        sync,
    })
}

/// Re-run defect extraction and sync for a saved inspection.
pub async fn resync<S>(store: &S, inspection_id: DbId, actor: DbId) -> Result<SyncOutcome, CoreError>
where
    S: FleetStore + ?Sized,
{
    let stored = store
        .get_inspection(inspection_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "inspection",
            id: inspection_id,
        })?;

    Ok(sync_items(store, &stored.inspection, &stored.items, actor).await)
}

async fn sync_items<S>(
    store: &S,
    inspection: &Inspection,
    items: &[InspectionItem],
    created_by: DbId,
) -> SyncOutcome
where
    S: FleetStore + ?Sized,
{
    let request = SyncRequest {
        inspection_id: inspection.id,
        asset_id: inspection.asset_id.clone(),
        created_by,
        defects: extract_defects(items),
    };

    let outcome = ActionSynchronizer::new(store).sync(&request).await;
    if outcome.is_degraded() {
        tracing::warn!(
            inspection_id = inspection.id,
            asset_id = %inspection.asset_id,
            failed = outcome.errors.len(),
            "Defect sync degraded; inspection saved, resync required"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;
    use crate::action::{ActionStatus, Transition};
    use crate::inspection::{ItemStatus, SubmitInspectionItem};
    use crate::lifecycle;
    use crate::store::{ActionFilter, ActionStore, InspectionStore, MemoryStore};

    const INSPECTOR: DbId = 3;
    const MANAGER: DbId = 42;

    fn cell(item_number: i32, day: i16, status: ItemStatus, comment: Option<&str>) -> SubmitInspectionItem {
        SubmitInspectionItem {
            item_number,
            item_description: match item_number {
                7 => "Oil level".to_string(),
                _ => format!("Item {item_number}"),
            },
            day_of_week: day,
            status,
            comment: comment.map(str::to_string),
            photo_ref: None,
        }
    }

    fn submission(items: Vec<SubmitInspectionItem>) -> SubmitInspection {
        SubmitInspection {
            asset_id: "P001".to_string(),
            inspector_id: INSPECTOR,
            week_ending: None,
            client_ref: None,
            items,
        }
    }

    #[tokio::test]
    async fn fleet_defect_lifecycle_end_to_end() {
        let store = MemoryStore::new();

        // Week 1: oil leak reported on Monday.
        let week1 = submit_inspection(
            &store,
            submission(vec![
                cell(7, 1, ItemStatus::Defect, Some("oil leak")),
                cell(8, 1, ItemStatus::Ok, None),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(week1.sync.created_count, 1);
        let open = store.list_open_actions("P001").await.unwrap();
        assert_eq!(open.len(), 1);
        let action_id = open[0].id;
        assert_eq!(open[0].status, ActionStatus::Pending);

        // Week 2: item 7 is pre-filled from the registry.
        let registry = load_registry(&store, "P001").await.unwrap();
        let lock = registry.lookup(7, "Oil level").unwrap();
        assert_eq!(lock.comment, "oil leak");
        assert_eq!(lock.action_id, action_id);

        // A stale client tries to approve it; the server restores the lock.
        let week2 = submit_inspection(
            &store,
            submission(vec![cell(7, 1, ItemStatus::Ok, None), cell(8, 1, ItemStatus::Ok, None)]),
        )
        .await
        .unwrap();
        assert_eq!(week2.coerced_cells.len(), 1);
        assert_eq!(week2.sync.created_count, 0);
        assert_eq!(week2.sync.attached_count, 1);
        assert_eq!(store.list_open_actions("P001").await.unwrap().len(), 1);

        // Management logs and completes the action.
        lifecycle::transition(
            &store,
            action_id,
            &Transition::MarkLogged {
                comment: "parts ordered".to_string(),
            },
            MANAGER,
        )
        .await
        .unwrap();
        let registry = load_registry(&store, "P001").await.unwrap();
        assert_eq!(registry.lookup(7, "Oil level").unwrap().comment, "parts ordered");

        lifecycle::transition(&store, action_id, &Transition::MarkComplete, MANAGER)
            .await
            .unwrap();
        assert!(load_registry(&store, "P001").await.unwrap().is_empty());

        // Week 3: the fault recurs and a fresh action is raised.
        let week3 = submit_inspection(
            &store,
            submission(vec![cell(7, 2, ItemStatus::Defect, None)]),
        )
        .await
        .unwrap();
        assert_eq!(week3.sync.created_count, 1);
        assert!(week3.coerced_cells.is_empty());

        let all = store.list_actions(&ActionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        let open = store.list_open_actions("P001").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_ne!(open[0].id, action_id);
    }

    #[tokio::test]
    async fn replayed_client_ref_saves_once() {
        let store = MemoryStore::new();
        let client_ref = Uuid::new_v4();
        let mut request = submission(vec![cell(7, 1, ItemStatus::Defect, None)]);
        request.client_ref = Some(client_ref);

        let first = submit_inspection(&store, request.clone()).await.unwrap();
        let second = submit_inspection(&store, request).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.inspection.id, second.inspection.id);
        assert_eq!(second.sync.created_count, 0);
        assert_eq!(second.sync.attached_count, 1);
        assert_eq!(store.list_open_actions("P001").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replay_after_completion_raises_nothing() {
        let store = MemoryStore::new();
        let mut request = submission(vec![cell(7, 1, ItemStatus::Defect, Some("oil leak"))]);
        request.client_ref = Some(Uuid::new_v4());

        let first = submit_inspection(&store, request.clone()).await.unwrap();
        assert_eq!(first.sync.created_count, 1);
        let action_id = store.list_open_actions("P001").await.unwrap()[0].id;
        lifecycle::transition(&store, action_id, &Transition::MarkComplete, MANAGER)
            .await
            .unwrap();

        let replay = submit_inspection(&store, request).await.unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.sync.created_count, 0);
        assert!(!replay.sync.is_degraded());

        let again = resync(&store, first.inspection.id, MANAGER).await.unwrap();
        assert_eq!(again.created_count, 0);

        let all = store.list_actions(&ActionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ActionStatus::Completed);
    }

    #[tokio::test]
    async fn unreadable_locks_reject_the_submission() {
        let store = MemoryStore::new();
        submit_inspection(&store, submission(vec![cell(7, 1, ItemStatus::Defect, None)]))
            .await
            .unwrap();

        store.set_actions_unavailable(true);
        let mut request = submission(vec![cell(7, 2, ItemStatus::Ok, None)]);
        request.client_ref = Some(Uuid::new_v4());
        assert_matches!(
            submit_inspection(&store, request.clone()).await,
            Err(CoreError::Unavailable(_))
        );

        // Nothing was saved: the retry is a first submission, and the lock
        // is applied to it.
        store.set_actions_unavailable(false);
        let retried = submit_inspection(&store, request).await.unwrap();
        assert!(!retried.replayed);
        assert_eq!(retried.coerced_cells.len(), 1);
        assert_eq!(retried.items[0].status, ItemStatus::Defect);
    }

    #[tokio::test]
    async fn sync_failure_does_not_block_the_save() {
        let store = MemoryStore::new();
        store.set_action_writes_unavailable(true);

        let result = submit_inspection(
            &store,
            submission(vec![cell(7, 1, ItemStatus::Defect, None)]),
        )
        .await
        .unwrap();
        assert!(result.sync.is_degraded());
        assert!(store.get_inspection(result.inspection.id).await.unwrap().is_some());

        store.set_action_writes_unavailable(false);
        let retried = resync(&store, result.inspection.id, MANAGER).await.unwrap();
        assert_eq!(retried.created_count, 1);
        assert!(!retried.is_degraded());

        let again = resync(&store, result.inspection.id, MANAGER).await.unwrap();
        assert_eq!(again.created_count, 0);
        assert_eq!(again.attached_count, 1);
    }

    #[tokio::test]
    async fn invalid_submission_saves_nothing() {
        let store = MemoryStore::new();
        let result = submit_inspection(
            &store,
            submission(vec![cell(7, 9, ItemStatus::Defect, None)]),
        )
        .await;
        assert_matches!(result, Err(CoreError::Validation(_)));
        assert!(store.get_inspection(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resync_of_unknown_inspection_is_not_found() {
        let store = MemoryStore::new();
        assert_matches!(
            resync(&store, 77, MANAGER).await,
            Err(CoreError::NotFound { entity: "inspection", id: 77 })
        );
    }
}

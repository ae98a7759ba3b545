//! Persisted action transitions.
//!
//! Wraps [`apply_transition`] with the store round-trip: read the action,
//! compute the next state, then save it only if the status is still the one
//! that was read.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::action::{apply_transition, Action, ActionOccurrence, Transition};
use crate::error::CoreError;
use crate::store::ActionStore;
use crate::types::DbId;

/// An action together with the inspections that reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDetail {
    #[serde(flatten)]
    pub action: Action,
    pub occurrences: Vec<ActionOccurrence>,
}

/// Load an action or fail with `NotFound`.
pub async fn get_action<S>(store: &S, id: DbId) -> Result<Action, CoreError>
where
    S: ActionStore + ?Sized,
{
    store
        .get_action(id)
        .await?
        .ok_or(CoreError::NotFound { entity: "action", id })
}

/// Load an action with its occurrence history.
pub async fn get_action_detail<S>(store: &S, id: DbId) -> Result<ActionDetail, CoreError>
where
    S: ActionStore + ?Sized,
{
    let action = get_action(store, id).await?;
    let occurrences = store.list_occurrences(id).await?;
    Ok(ActionDetail {
        action,
        occurrences,
    })
}

/// Apply `transition` to the action `id` on behalf of `actor`.
///
/// Idempotent transitions return the action unchanged. If another writer
/// changed the status between the read and the write, the call fails with
/// [`CoreError::Conflict`] and nothing is overwritten.
pub async fn transition<S>(
    store: &S,
    id: DbId,
    transition: &Transition,
    actor: DbId,
) -> Result<Action, CoreError>
where
    S: ActionStore + ?Sized,
{
    let current = get_action(store, id).await?;

    let Some(next) = apply_transition(&current, transition, actor, Utc::now())? else {
        tracing::debug!(
            action_id = id,
            transition = transition.name(),
            status = current.status.as_str(),
            "Transition is a no-op"
        );
        return Ok(current);
    };

    match store.save_transition(&next, current.status).await? {
        Some(saved) => {
            tracing::info!(
                action_id = id,
                asset_id = %saved.asset_id,
                transition = transition.name(),
                from = current.status.as_str(),
                to = saved.status.as_str(),
                actor,
                "Action transitioned"
            );
            Ok(saved)
        }
        None => match store.get_action(id).await? {
            None => Err(CoreError::NotFound { entity: "action", id }),
            Some(latest) => Err(CoreError::Conflict(format!(
                "Action {id} changed from {} to {} while it was being updated",
                current.status.as_str(),
                latest.status.as_str()
            ))),
        },
    }
}

/// Delete an action. Deleting a missing action succeeds.
///
/// Returns `true` when a row was removed.
pub async fn delete<S>(store: &S, id: DbId) -> Result<bool, CoreError>
where
    S: ActionStore + ?Sized,
{
    let removed = store.delete_action(id).await?;
    if removed {
        tracing::info!(action_id = id, "Action deleted");
    } else {
        tracing::debug!(action_id = id, "Delete of missing action ignored");
    }
    Ok(removed)
}

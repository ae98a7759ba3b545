//! Handlers for listing actions and driving their lifecycle.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use fleet_core::action::Transition;
use fleet_core::lifecycle;
use fleet_core::store::{ActionFilter, ActionStore};
use fleet_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::actor::Actor;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /actions/{id}/log`.
#[derive(Debug, Deserialize)]
pub struct LogActionRequest {
    #[serde(default)]
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// List actions, newest first, optionally filtered by asset and status.
pub async fn list_actions(
    State(state): State<AppState>,
    Query(filter): Query<ActionFilter>,
) -> AppResult<impl IntoResponse> {
    let actions = state.store.list_actions(&filter).await?;
    Ok(Json(DataResponse { data: actions }))
}

/// Get an action with its occurrence history.
pub async fn get_action(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = lifecycle::get_action_detail(state.store.as_ref(), id).await?;
    Ok(Json(DataResponse { data: detail }))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

async fn apply(
    state: &AppState,
    id: DbId,
    transition: Transition,
    actor: DbId,
) -> AppResult<impl IntoResponse> {
    let action = lifecycle::transition(state.store.as_ref(), id, &transition, actor).await?;
    Ok(Json(DataResponse { data: action }))
}

/// `pending -> logged`; requires a non-empty comment of at most 40 characters.
pub async fn log_action(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<LogActionRequest>,
) -> AppResult<impl IntoResponse> {
    apply(
        &state,
        id,
        Transition::MarkLogged {
            comment: input.comment,
        },
        actor.user_id,
    )
    .await
}

/// `pending | logged -> completed`.
pub async fn complete_action(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    apply(&state, id, Transition::MarkComplete, actor.user_id).await
}

/// `logged -> pending`, clearing the logged comment.
pub async fn undo_log_action(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    apply(&state, id, Transition::UndoLogged, actor.user_id).await
}

/// `completed -> pending | logged`, restoring the status it was completed from.
pub async fn undo_complete_action(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    apply(&state, id, Transition::UndoComplete, actor.user_id).await
}

/// Delete an action. Deleting a missing action is not an error.
pub async fn delete_action(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    lifecycle::delete(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

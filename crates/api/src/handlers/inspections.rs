//! Handlers for inspection submission and manual resync.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use fleet_core::error::CoreError;
use fleet_core::inspection::SubmitInspection;
use fleet_core::store::InspectionStore;
use fleet_core::submission;
use fleet_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::actor::Actor;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /inspections
// ---------------------------------------------------------------------------

/// Save a completed inspection, re-apply defect locks and sync its defects.
///
/// Returns `201` for a new inspection and `200` for a replayed `client_ref`.
/// A degraded sync does not fail the request; see `data.sync.errors`.
pub async fn submit_inspection(
    State(state): State<AppState>,
    Json(input): Json<SubmitInspection>,
) -> AppResult<impl IntoResponse> {
    let result = submission::submit_inspection(state.store.as_ref(), input).await?;

    let status = if result.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(DataResponse { data: result })))
}

// ---------------------------------------------------------------------------
// GET /inspections/{id}
// ---------------------------------------------------------------------------

/// Get an inspection with its checklist items.
pub async fn get_inspection(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let stored = state
        .store
        .get_inspection(id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "inspection",
            id,
        })?;
    Ok(Json(DataResponse { data: stored }))
}

// ---------------------------------------------------------------------------
// POST /inspections/{id}/resync
// ---------------------------------------------------------------------------

/// Re-run defect extraction and action sync for a saved inspection.
pub async fn resync_inspection(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let outcome = submission::resync(state.store.as_ref(), id, actor.user_id).await?;

    tracing::info!(
        inspection_id = id,
        actor = actor.user_id,
        created = outcome.created_count,
        attached = outcome.attached_count,
        failed = outcome.errors.len(),
        "Inspection resynced"
    );

    Ok(Json(DataResponse { data: outcome }))
}

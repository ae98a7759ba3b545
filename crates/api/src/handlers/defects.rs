//! Handlers for defect sync and the open-defect lock lookup.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use fleet_core::lock_registry::load_registry;
use fleet_core::sync::{ActionSynchronizer, SyncRequest};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /defects/locked`.
#[derive(Debug, Deserialize)]
pub struct LockedDefectsParams {
    pub asset_id: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /defects/sync
// ---------------------------------------------------------------------------

/// Reconcile extracted defects against open actions.
///
/// Always `200` once the request is well-formed; per-item failures are listed
/// in `data.errors`.
pub async fn sync_defects(
    State(state): State<AppState>,
    Json(input): Json<SyncRequest>,
) -> AppResult<impl IntoResponse> {
    if input.asset_id.trim().is_empty() {
        return Err(AppError::BadRequest("asset_id is required".to_string()));
    }

    let outcome = ActionSynchronizer::new(state.store.as_ref())
        .sync(&input)
        .await;

    tracing::info!(
        inspection_id = input.inspection_id,
        asset_id = %input.asset_id,
        created = outcome.created_count,
        attached = outcome.attached_count,
        failed = outcome.errors.len(),
        "Defects synced"
    );

    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// GET /defects/locked?asset_id=
// ---------------------------------------------------------------------------

/// Open defects of an asset, used to pre-fill and lock the next checklist.
pub async fn locked_defects(
    State(state): State<AppState>,
    Query(params): Query<LockedDefectsParams>,
) -> AppResult<impl IntoResponse> {
    let asset_id = params
        .asset_id
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("asset_id query parameter is required".to_string()))?;

    let registry = load_registry(state.store.as_ref(), asset_id).await?;
    Ok(Json(DataResponse {
        data: registry.into_response(),
    }))
}

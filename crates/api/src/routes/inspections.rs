//! Route definitions for the `/inspections` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::inspections;
use crate::state::AppState;

/// Routes mounted at `/inspections`.
///
/// ```text
/// POST   /                 -> submit_inspection
/// GET    /{id}             -> get_inspection
/// POST   /{id}/resync      -> resync_inspection
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(inspections::submit_inspection))
        .route("/{id}", get(inspections::get_inspection))
        .route("/{id}/resync", post(inspections::resync_inspection))
}

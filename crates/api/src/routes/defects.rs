//! Route definitions for the `/defects` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::defects;
use crate::state::AppState;

/// Routes mounted at `/defects`.
///
/// ```text
/// POST   /sync             -> sync_defects
/// GET    /locked           -> locked_defects  (?asset_id=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync", post(defects::sync_defects))
        .route("/locked", get(defects::locked_defects))
}

//! Route definitions for the `/actions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::actions;
use crate::state::AppState;

/// Routes mounted at `/actions`.
///
/// ```text
/// GET    /                       -> list_actions  (?asset_id=&status=)
/// GET    /{id}                   -> get_action
/// DELETE /{id}                   -> delete_action
/// POST   /{id}/log               -> log_action
/// POST   /{id}/complete          -> complete_action
/// POST   /{id}/undo-log          -> undo_log_action
/// POST   /{id}/undo-complete     -> undo_complete_action
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(actions::list_actions))
        .route(
            "/{id}",
            get(actions::get_action).delete(actions::delete_action),
        )
        .route("/{id}/log", post(actions::log_action))
        .route("/{id}/complete", post(actions::complete_action))
        .route("/{id}/undo-log", post(actions::undo_log_action))
        .route("/{id}/undo-complete", post(actions::undo_complete_action))
}

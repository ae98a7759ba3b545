pub mod actions;
pub mod defects;
pub mod health;
pub mod inspections;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /inspections                        submit (POST)
/// /inspections/{id}                   get with items
/// /inspections/{id}/resync            re-run defect sync (POST)
///
/// /defects/sync                       sync defect descriptors (POST)
/// /defects/locked?asset_id=           open defects of an asset
///
/// /actions?asset_id=&status=          list
/// /actions/{id}                       get with occurrences, delete
/// /actions/{id}/log                   pending -> logged (POST)
/// /actions/{id}/complete              -> completed (POST)
/// /actions/{id}/undo-log              logged -> pending (POST)
/// /actions/{id}/undo-complete         completed -> previous status (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/inspections", inspections::router())
        .nest("/defects", defects::router())
        .nest("/actions", actions::router())
}

//! Acting-user extractor for Axum handlers.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in the `x-actor-id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fleet_core::error::CoreError;
use fleet_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the acting user's id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The user performing a request, recorded as `logged_by`, `actioned_by` or
/// `created_by`.
///
/// ```ignore
/// async fn my_handler(actor: Actor) -> AppResult<Json<()>> {
///     tracing::info!(actor = actor.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {ACTOR_HEADER} header"
                )))
            })?;

        let user_id: DbId = raw.trim().parse().map_err(|_| {
            AppError::BadRequest(format!("{ACTOR_HEADER} must be a numeric user id"))
        })?;

        Ok(Actor { user_id })
    }
}

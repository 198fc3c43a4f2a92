//! Route definitions for the `/requests` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::requests;
use crate::state::AppState;

/// Routes mounted at `/requests`.
///
/// ```text
/// GET  /                  -> list (role-scoped)
/// POST /                  -> submit (requester)
/// GET  /{id}              -> detail
/// GET  /{id}/signatures   -> signatures
/// POST /{id}/sign         -> sign (active role must be a signing role)
/// POST /{id}/cancel       -> cancel (original requester only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(requests::list).post(requests::submit))
        .route("/{id}", get(requests::detail))
        .route("/{id}/signatures", get(requests::signatures))
        .route("/{id}/sign", post(requests::sign))
        .route("/{id}/cancel", post(requests::cancel))
}

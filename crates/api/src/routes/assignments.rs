//! Route definitions for the `/assignments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::assignments;
use crate::state::AppState;

/// Routes mounted at `/assignments`.
///
/// ```text
/// GET  /                -> list_assignments
/// POST /                -> create_assignment (warehouse)
/// POST /{id}/unassign   -> unassign (administrator)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(assignments::list_assignments).post(assignments::create_assignment),
        )
        .route("/{id}/unassign", post(assignments::unassign))
}

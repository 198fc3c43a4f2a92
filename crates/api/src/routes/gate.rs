//! Route definitions for the `/gate` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::gate;
use crate::state::AppState;

/// Routes mounted at `/gate` (all guard-only).
///
/// ```text
/// GET  /authorizations           -> authorizations
/// POST /requests/{id}/exit       -> record_exit
/// POST /requests/{id}/reentry    -> record_reentry
/// GET  /events                   -> list_events
/// GET  /events/{id}              -> get_event
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authorizations", get(gate::authorizations))
        .route("/requests/{id}/exit", post(gate::record_exit))
        .route("/requests/{id}/reentry", post(gate::record_reentry))
        .route("/events", get(gate::list_events))
        .route("/events/{id}", get(gate::get_event))
}

//! Route definitions for the `/locations` catalog.

use axum::routing::get;
use axum::Router;

use crate::handlers::locations;
use crate::state::AppState;

/// Routes mounted at `/locations`.
///
/// ```text
/// GET  /       -> list_locations
/// POST /       -> create_location (warehouse)
/// GET  /{id}   -> get_location
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(locations::list_locations).post(locations::create_location),
        )
        .route("/{id}", get(locations::get_location))
}

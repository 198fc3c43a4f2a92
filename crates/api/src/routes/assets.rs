//! Route definitions for the `/assets` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Routes mounted at `/assets`.
///
/// ```text
/// GET  /             -> list_assets
/// POST /             -> create_asset (warehouse)
/// GET  /available    -> list_available
/// GET  /unassigned   -> list_unassigned (warehouse)
/// GET  /next-plate   -> next_plate (warehouse)
/// GET  /{id}         -> get_asset
/// PUT  /{id}         -> update_asset (administrator)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assets::list_assets).post(assets::create_asset))
        .route("/available", get(assets::list_available))
        .route("/unassigned", get(assets::list_unassigned))
        .route("/next-plate", get(assets::next_plate))
        .route("/{id}", get(assets::get_asset).put(assets::update_asset))
}

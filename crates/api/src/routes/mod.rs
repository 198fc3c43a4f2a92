//! Route tree for the API.

pub mod assets;
pub mod assignments;
pub mod audit;
pub mod auth;
pub mod gate;
pub mod health;
pub mod locations;
pub mod requests;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                        login (public)
/// /auth/register                     register (public)
/// /auth/me                           profile + roles
/// /auth/switch-role                  switch active role
///
/// /assets                            registry (list, create)
/// /assets/available                  loanable assets
/// /assets/unassigned                 assets with no custodian
/// /assets/next-plate                 sequential plate suggestion
/// /assets/{id}                       get, update
///
/// /assignments                       custody ledger (list, create)
/// /assignments/{id}/unassign         release assignment
///
/// /locations                         site catalog (list, create)
/// /locations/{id}                    get
///
/// /requests                          loan requests (list, submit)
/// /requests/{id}                     detail with physical state
/// /requests/{id}/signatures          signature set
/// /requests/{id}/sign                record a signature
/// /requests/{id}/cancel              cancel pending request
///
/// /gate/authorizations               guard's work list
/// /gate/requests/{id}/exit           record exit
/// /gate/requests/{id}/reentry        record re-entry
/// /gate/events                       movement ledger
/// /gate/events/{id}                  one entry with per-asset movements
///
/// /audit                             audit trail (administrator)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/assets", assets::router())
        .nest("/assignments", assignments::router())
        .nest("/locations", locations::router())
        .nest("/requests", requests::router())
        .nest("/gate", gate::router())
        .nest("/audit", audit::router())
}

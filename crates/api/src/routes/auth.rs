//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /login        -> login (public)
/// POST /register     -> register (public)
/// GET  /me           -> me (requires auth)
/// POST /switch-role  -> switch_role (requires auth; target role must be held)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/me", get(auth::me))
        .route("/switch-role", post(auth::switch_role))
}

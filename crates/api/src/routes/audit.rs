//! Route definitions for the `/audit` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Routes mounted at `/audit`.
///
/// ```text
/// GET / -> query_audit (administrator; filtered, paginated)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(audit::query_audit))
}

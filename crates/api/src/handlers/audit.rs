//! Handlers for the `/audit` resource (administrator audit-trail view).

use axum::extract::{Query, State};
use axum::Json;
use sgb_db::models::audit::{AuditLog, AuditQuery};
use sgb_db::repositories::AuditLogRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdministrator;
use crate::response::PageResponse;
use crate::state::AppState;

/// GET /api/v1/audit
///
/// Filtered, paginated audit log listing (administrator only).
pub async fn query_audit(
    State(state): State<AppState>,
    RequireAdministrator(_user): RequireAdministrator,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<PageResponse<AuditLog>>> {
    let data = AuditLogRepo::query(&state.pool, &params).await?;
    let total = AuditLogRepo::count(&state.pool, &params).await?;
    Ok(Json(PageResponse { data, total }))
}

//! Handlers for the `/assignments` resource (custody ledger).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sgb_core::types::DbId;
use sgb_db::models::assignment::{AssignmentDetail, CreateAssignment, CustodyAssignment};
use sgb_db::repositories::AssignmentRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdministrator, RequireWarehouse};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /assignments`.
#[derive(Debug, Deserialize)]
pub struct ListAssignmentsQuery {
    pub custodian_id: Option<DbId>,
}

/// POST /api/v1/assignments
///
/// Bind an asset to a custodian at a location (warehouse only).
pub async fn create_assignment(
    State(state): State<AppState>,
    RequireWarehouse(user): RequireWarehouse,
    Json(input): Json<CreateAssignment>,
) -> AppResult<(StatusCode, Json<DataResponse<CustodyAssignment>>)> {
    let assignment = AssignmentRepo::assign(&state.pool, user.user_id, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: assignment }),
    ))
}

/// GET /api/v1/assignments
///
/// Active assignments, optionally filtered by custodian.
pub async fn list_assignments(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ListAssignmentsQuery>,
) -> AppResult<Json<DataResponse<Vec<AssignmentDetail>>>> {
    let assignments = AssignmentRepo::list_active(&state.pool, query.custodian_id).await?;
    Ok(Json(DataResponse { data: assignments }))
}

/// POST /api/v1/assignments/{id}/unassign
///
/// Release an active assignment (administrator only). Rejected while the
/// asset is out on an active loan.
pub async fn unassign(
    State(state): State<AppState>,
    RequireAdministrator(user): RequireAdministrator,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CustodyAssignment>>> {
    let released = AssignmentRepo::unassign(&state.pool, user.user_id, id).await?;
    Ok(Json(DataResponse { data: released }))
}

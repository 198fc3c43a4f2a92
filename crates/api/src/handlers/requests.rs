//! Handlers for the `/requests` resource (loan request lifecycle).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sgb_core::error::CoreError;
use sgb_core::roles::{ROLE_ADMINISTRATOR, ROLE_COORDINATOR, ROLE_CUSTODIAN};
use sgb_core::types::DbId;
use sgb_core::workflow::SignerRole;
use sgb_db::models::request::{
    CreateRequestBatch, CreatedRequest, LoanRequest, RequestDetail, RequestSignature,
    RequestSummary, SignRequest,
};
use sgb_db::repositories::{GateRepo, RequestRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireRequester;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /requests`.
#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub state: Option<String>,
}

/// POST /api/v1/requests
///
/// Submit a batch of desired assets. The batch is grouped by current
/// custodian; one request is created per custodian group.
pub async fn submit(
    State(state): State<AppState>,
    RequireRequester(user): RequireRequester,
    Json(input): Json<CreateRequestBatch>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<CreatedRequest>>>)> {
    let created = RequestRepo::submit_batch(&state.pool, user.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/requests
///
/// Role-scoped listing: requesters see their own requests, custodians the
/// requests addressed to them, coordinators and administrators everything.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListRequestsQuery>,
) -> AppResult<Json<DataResponse<Vec<RequestSummary>>>> {
    let (requester_filter, custodian_filter) = match user.role.as_str() {
        ROLE_CUSTODIAN => (None, Some(user.user_id)),
        ROLE_COORDINATOR | ROLE_ADMINISTRATOR => (None, None),
        _ => (Some(user.user_id), None),
    };
    let requests = RequestRepo::list(
        &state.pool,
        requester_filter,
        custodian_filter,
        query.state.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: requests }))
}

/// GET /api/v1/requests/{id}
///
/// Full detail: the request row, its assets with derived physical state,
/// and the signature set.
pub async fn detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RequestDetail>>> {
    let request = RequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "LoanRequest",
            id,
        }))?;
    let assets = GateRepo::asset_states(&state.pool, id).await?;
    let signatures = RequestRepo::signatures(&state.pool, id).await?;

    Ok(Json(DataResponse {
        data: RequestDetail {
            request,
            assets,
            signatures,
        },
    }))
}

/// GET /api/v1/requests/{id}/signatures
pub async fn signatures(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<RequestSignature>>>> {
    let signatures = RequestRepo::signatures(&state.pool, id).await?;
    Ok(Json(DataResponse { data: signatures }))
}

/// POST /api/v1/requests/{id}/sign
///
/// Record the caller's signature. The signing role is the session's active
/// role: it must be one of the three signing roles, and the caller must hold
/// it in the database.
pub async fn sign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<SignRequest>,
) -> AppResult<Json<DataResponse<LoanRequest>>> {
    let role = SignerRole::parse(&user.role).map_err(|_| {
        AppError::Core(CoreError::Forbidden(format!(
            "Active role '{}' cannot sign requests",
            user.role
        )))
    })?;
    let held = UserRepo::has_role(&state.pool, user.user_id, role.as_str()).await?;
    if !held {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "User does not hold role '{role}'"
        ))));
    }

    let updated = RequestRepo::sign(
        &state.pool,
        id,
        role,
        user.user_id,
        input.approve,
        input.comment.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/requests/{id}/cancel
///
/// Cancel a pending request. Only the original requester may cancel.
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<LoanRequest>>> {
    let cancelled = RequestRepo::cancel(&state.pool, id, user.user_id).await?;
    Ok(Json(DataResponse { data: cancelled }))
}

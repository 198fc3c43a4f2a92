//! Handlers for the `/gate` resource (exit/re-entry ledger, guard views).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sgb_core::error::CoreError;
use sgb_core::types::DbId;
use sgb_db::models::gate::{
    GateAuthorization, GateEvent, GateEventDetail, GateEventSummary, RecordExit, RecordReentry,
};
use sgb_db::repositories::GateRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireGuard;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/gate/authorizations
///
/// Approved, not-yet-closed requests the guard may act on.
pub async fn authorizations(
    State(state): State<AppState>,
    RequireGuard(_user): RequireGuard,
) -> AppResult<Json<DataResponse<Vec<GateAuthorization>>>> {
    let auths = GateRepo::authorizations(&state.pool).await?;
    Ok(Json(DataResponse { data: auths }))
}

/// POST /api/v1/gate/requests/{id}/exit
pub async fn record_exit(
    State(state): State<AppState>,
    RequireGuard(user): RequireGuard,
    Path(id): Path<DbId>,
    Json(input): Json<RecordExit>,
) -> AppResult<(StatusCode, Json<DataResponse<GateEvent>>)> {
    let event = GateRepo::record_exit(&state.pool, id, user.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// POST /api/v1/gate/requests/{id}/reentry
pub async fn record_reentry(
    State(state): State<AppState>,
    RequireGuard(user): RequireGuard,
    Path(id): Path<DbId>,
    Json(input): Json<RecordReentry>,
) -> AppResult<(StatusCode, Json<DataResponse<GateEvent>>)> {
    let event = GateRepo::record_reentry(&state.pool, id, user.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// GET /api/v1/gate/events
///
/// The gate movement ledger, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    RequireGuard(_user): RequireGuard,
) -> AppResult<Json<DataResponse<Vec<GateEventSummary>>>> {
    let events = GateRepo::list_events(&state.pool).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/gate/events/{id}
///
/// One ledger entry with the movement recorded for each asset.
pub async fn get_event(
    State(state): State<AppState>,
    RequireGuard(_user): RequireGuard,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GateEventDetail>>> {
    let detail = GateRepo::event_detail(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GateEvent",
            id,
        }))?;
    Ok(Json(DataResponse { data: detail }))
}

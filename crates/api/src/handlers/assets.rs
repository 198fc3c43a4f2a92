//! Handlers for the `/assets` resource (registry and availability views).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use sgb_core::audit::{action_types, entity_types};
use sgb_core::error::CoreError;
use sgb_core::types::DbId;
use sgb_db::models::asset::{Asset, AvailableAsset, CreateAsset, UpdateAsset};
use sgb_db::models::audit::CreateAuditLog;
use sgb_db::repositories::{AssetRepo, AuditLogRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdministrator, RequireWarehouse};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/assets
///
/// Register a new asset (warehouse only).
pub async fn create_asset(
    State(state): State<AppState>,
    RequireWarehouse(user): RequireWarehouse,
    Json(input): Json<CreateAsset>,
) -> AppResult<(StatusCode, Json<DataResponse<Asset>>)> {
    if input.serial.trim().is_empty() {
        return Err(AppError::BadRequest("serial must not be empty".into()));
    }
    if input.plate.trim().is_empty() {
        return Err(AppError::BadRequest("plate must not be empty".into()));
    }

    let asset = AssetRepo::create(&state.pool, &input).await?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            actor_id: Some(user.user_id),
            action_type: action_types::ASSET_CREATE,
            entity_type: Some(entity_types::ASSET),
            entity_id: Some(asset.id),
            before_state: None,
            after_state: None,
            details_json: Some(serde_json::json!({
                "serial": asset.serial,
                "plate": asset.plate,
            })),
        },
    )
    .await?;

    tracing::info!(asset_id = asset.id, plate = %asset.plate, "Asset registered");

    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// GET /api/v1/assets
pub async fn list_assets(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Asset>>>> {
    let assets = AssetRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// GET /api/v1/assets/available
///
/// Assets a requester can put in a loan request right now.
pub async fn list_available(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<AvailableAsset>>>> {
    let assets = AssetRepo::list_available(&state.pool).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// GET /api/v1/assets/unassigned
///
/// Assets with no active custodian, for the warehouse assignment screen.
pub async fn list_unassigned(
    State(state): State<AppState>,
    RequireWarehouse(_user): RequireWarehouse,
) -> AppResult<Json<DataResponse<Vec<Asset>>>> {
    let assets = AssetRepo::list_unassigned(&state.pool).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// Response body for `GET /assets/next-plate`.
#[derive(Debug, Serialize)]
pub struct NextPlateResponse {
    pub next_plate: i64,
}

/// GET /api/v1/assets/next-plate
pub async fn next_plate(
    State(state): State<AppState>,
    RequireWarehouse(_user): RequireWarehouse,
) -> AppResult<Json<DataResponse<NextPlateResponse>>> {
    let next_plate = AssetRepo::next_plate(&state.pool).await?;
    Ok(Json(DataResponse {
        data: NextPlateResponse { next_plate },
    }))
}

/// GET /api/v1/assets/{id}
pub async fn get_asset(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let asset = AssetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Asset",
            id,
        }))?;
    Ok(Json(DataResponse { data: asset }))
}

/// PUT /api/v1/assets/{id}
///
/// Administrative correction of descriptive attributes. Serial and plate are
/// immutable after registration.
pub async fn update_asset(
    State(state): State<AppState>,
    RequireAdministrator(user): RequireAdministrator,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAsset>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let asset = AssetRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Asset",
            id,
        }))?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            actor_id: Some(user.user_id),
            action_type: action_types::ASSET_UPDATE,
            entity_type: Some(entity_types::ASSET),
            entity_id: Some(id),
            before_state: None,
            after_state: None,
            details_json: None,
        },
    )
    .await?;

    Ok(Json(DataResponse { data: asset }))
}

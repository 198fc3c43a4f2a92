//! Handlers for the `/locations` catalog.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sgb_core::error::CoreError;
use sgb_core::types::DbId;
use sgb_db::models::location::{CreateLocation, Location};
use sgb_db::repositories::LocationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireWarehouse;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/locations
///
/// Add a location to the catalog (warehouse only). Assignments reference
/// locations by id, so this is where the catalog gets populated.
pub async fn create_location(
    State(state): State<AppState>,
    RequireWarehouse(_user): RequireWarehouse,
    Json(input): Json<CreateLocation>,
) -> AppResult<(StatusCode, Json<DataResponse<Location>>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let location = LocationRepo::create(&state.pool, &input).await?;

    tracing::info!(location_id = location.id, name = %location.name, "Location created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: location })))
}

/// GET /api/v1/locations
pub async fn list_locations(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Location>>>> {
    let locations = LocationRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: locations }))
}

/// GET /api/v1/locations/{id}
pub async fn get_location(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Location>>> {
    let location = LocationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Location",
            id,
        }))?;
    Ok(Json(DataResponse { data: location }))
}

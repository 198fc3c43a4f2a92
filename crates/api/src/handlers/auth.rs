//! Handlers for the `/auth` resource (login, register, me, switch-role).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sgb_core::audit::{action_types, entity_types};
use sgb_core::error::CoreError;
use sgb_core::roles::ROLE_REQUESTER;
use sgb_db::models::audit::CreateAuditLog;
use sgb_db::models::user::{CreateUser, UserResponse};
use sgb_db::repositories::{AuditLogRepo, RoleRepo, UserRepo};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Minimum accepted password length for registration.
const MIN_PASSWORD_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// National document number used as the login identifier.
    pub document: String,
    pub password: String,
}

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub document: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/switch-role`.
#[derive(Debug, Deserialize)]
pub struct SwitchRoleRequest {
    pub role: String,
}

/// Successful authentication response returned by login and switch-role.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// The session's active role (embedded in the token).
    pub active_role: String,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with document + password. The session's active role defaults
/// to `requester` when held, otherwise the user's first role.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_document(&state.pool, &input.document)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid document or password".into(),
            ))
        })?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid document or password".into(),
        )));
    }

    let roles = UserRepo::roles_for_user(&state.pool, user.id).await?;
    let active_role = roles
        .iter()
        .find(|r| r.as_str() == ROLE_REQUESTER)
        .or_else(|| roles.first())
        .cloned()
        .ok_or_else(|| AppError::Core(CoreError::Forbidden("User holds no roles".into())))?;

    let access_token = generate_access_token(user.id, &active_role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            actor_id: Some(user.id),
            action_type: action_types::LOGIN,
            entity_type: Some(entity_types::USER),
            entity_id: Some(user.id),
            before_state: None,
            after_state: None,
            details_json: None,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = %active_role, "User logged in");

    Ok(Json(AuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        active_role,
        user: UserResponse::from_user(user, roles),
    }))
}

/// POST /api/v1/auth/register
///
/// Create a new account. New users start with the `requester` role; any
/// other role is granted by an administrator out of band.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    if input.document.trim().is_empty() {
        return Err(AppError::BadRequest("document must not be empty".into()));
    }
    if input.email.trim().is_empty() {
        return Err(AppError::BadRequest("email must not be empty".into()));
    }
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(AppError::BadRequest)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            document: input.document,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            password_hash,
        },
    )
    .await?;
    UserRepo::grant_role(&state.pool, user.id, ROLE_REQUESTER).await?;

    tracing::info!(user_id = user.id, "User registered");

    let roles = vec![ROLE_REQUESTER.to_string()];
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from_user(user, roles),
        }),
    ))
}

/// GET /api/v1/auth/me
///
/// Return the authenticated user's profile, roles, and active role.
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<AuthProfileResponse>> {
    let record = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        }))?;
    let roles = UserRepo::roles_for_user(&state.pool, user.user_id).await?;

    Ok(Json(AuthProfileResponse {
        active_role: user.role,
        user: UserResponse::from_user(record, roles),
    }))
}

/// Response body for `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct AuthProfileResponse {
    pub active_role: String,
    pub user: UserResponse,
}

/// POST /api/v1/auth/switch-role
///
/// Issue a new access token with a different active role. The target role
/// must be held in the database, not merely claimed.
pub async fn switch_role(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<SwitchRoleRequest>,
) -> AppResult<Json<AuthResponse>> {
    if RoleRepo::find_by_name(&state.pool, &input.role).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "Unknown role '{}'",
            input.role
        )));
    }

    let held = UserRepo::has_role(&state.pool, user.user_id, &input.role).await?;
    if !held {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "User does not hold role '{}'",
            input.role
        ))));
    }

    let record = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        }))?;
    if !record.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let access_token = generate_access_token(user.user_id, &input.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            actor_id: Some(user.user_id),
            action_type: action_types::ROLE_SWITCH,
            entity_type: Some(entity_types::USER),
            entity_id: Some(user.user_id),
            before_state: Some(user.role.clone()),
            after_state: Some(input.role.clone()),
            details_json: None,
        },
    )
    .await?;

    tracing::info!(user_id = user.user_id, from = %user.role, to = %input.role, "Active role switched");

    let roles = UserRepo::roles_for_user(&state.pool, user.user_id).await?;
    Ok(Json(AuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        active_role: input.role,
        user: UserResponse::from_user(record, roles),
    }))
}

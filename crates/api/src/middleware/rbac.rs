//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose active role
//! does not meet the requirement. The role claim in the token is necessary
//! but not sufficient: membership is re-verified against the `user_roles`
//! table on every privileged request, so a revoked role takes effect without
//! waiting for token expiry.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sgb_core::error::CoreError;
use sgb_core::roles::{ROLE_ADMINISTRATOR, ROLE_GUARD, ROLE_REQUESTER, ROLE_WAREHOUSE};
use sgb_db::repositories::UserRepo;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Check that the session's active role is `role` and that the user actually
/// holds it in the database.
async fn require_role(user: &AuthUser, role: &str, state: &AppState) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Active role '{}' is not '{role}'",
            user.role
        ))));
    }
    let held = UserRepo::has_role(&state.pool, user.user_id, role).await?;
    if !held {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "User does not hold role '{role}'"
        ))));
    }
    Ok(())
}

/// Requires the `administrator` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdministrator(user): RequireAdministrator) -> AppResult<Json<()>> {
///     // user is guaranteed to be an administrator here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdministrator(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdministrator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, ROLE_ADMINISTRATOR, state).await?;
        Ok(RequireAdministrator(user))
    }
}

/// Requires the `warehouse` role. Rejects with 403 Forbidden otherwise.
pub struct RequireWarehouse(pub AuthUser);

impl FromRequestParts<AppState> for RequireWarehouse {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, ROLE_WAREHOUSE, state).await?;
        Ok(RequireWarehouse(user))
    }
}

/// Requires the `guard` role. Rejects with 403 Forbidden otherwise.
pub struct RequireGuard(pub AuthUser);

impl FromRequestParts<AppState> for RequireGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, ROLE_GUARD, state).await?;
        Ok(RequireGuard(user))
    }
}

/// Requires the `requester` role. Rejects with 403 Forbidden otherwise.
pub struct RequireRequester(pub AuthUser);

impl FromRequestParts<AppState> for RequireRequester {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, ROLE_REQUESTER, state).await?;
        Ok(RequireRequester(user))
    }
}

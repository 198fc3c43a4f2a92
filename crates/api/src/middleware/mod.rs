//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdministrator`] -- Requires the `administrator` role.
//! - [`rbac::RequireWarehouse`] -- Requires the `warehouse` role.
//! - [`rbac::RequireGuard`] -- Requires the `guard` role.
//!
//! The RBAC extractors re-verify role membership against `user_roles` in the
//! database; the role claim in the token alone never authorizes anything.

pub mod auth;
pub mod rbac;

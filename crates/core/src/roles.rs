//! Well-known role name constants.
//!
//! These must match the seed data in the `roles` table migration. A user may
//! hold several roles; a session acts under exactly one *active* role, which
//! is re-verified against the persisted `user_roles` rows before any
//! privileged operation.

pub const ROLE_REQUESTER: &str = "requester";
pub const ROLE_CUSTODIAN: &str = "custodian";
pub const ROLE_COORDINATOR: &str = "coordinator";
pub const ROLE_ADMINISTRATOR: &str = "administrator";
pub const ROLE_WAREHOUSE: &str = "warehouse";
pub const ROLE_GUARD: &str = "guard";

/// All seeded role names.
pub const ALL_ROLES: &[&str] = &[
    ROLE_REQUESTER,
    ROLE_CUSTODIAN,
    ROLE_COORDINATOR,
    ROLE_ADMINISTRATOR,
    ROLE_WAREHOUSE,
    ROLE_GUARD,
];

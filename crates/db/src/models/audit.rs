//! Audit log models and DTOs.
//!
//! Audit logs have no `updated_at` field: rows are immutable once written.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sgb_core::types::{DbId, Timestamp};

/// A single audit log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub actor_id: Option<DbId>,
    pub action_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub before_state: Option<String>,
    pub after_state: Option<String>,
    pub details_json: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

/// DTO for inserting a new audit log entry.
#[derive(Debug, Clone)]
pub struct CreateAuditLog {
    pub actor_id: Option<DbId>,
    pub action_type: &'static str,
    pub entity_type: Option<&'static str>,
    pub entity_id: Option<DbId>,
    pub before_state: Option<String>,
    pub after_state: Option<String>,
    pub details_json: Option<serde_json::Value>,
}

/// Filter parameters for querying audit logs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<DbId>,
    pub action_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

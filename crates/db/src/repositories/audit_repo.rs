//! Repository for the `audit_logs` table.
//!
//! Inserts take a `PgConnection` instead of a pool so workflow repositories
//! can write the audit row inside the same transaction as the transition it
//! records.

use sqlx::{PgConnection, PgPool};

use crate::models::audit::{AuditLog, AuditQuery, CreateAuditLog};

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str = "id, actor_id, action_type, entity_type, entity_id, \
    before_state, after_state, details_json, created_at";

/// Provides insert and query operations for audit logs.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Insert one audit log entry on an existing connection/transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        entry: &CreateAuditLog,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO audit_logs
                (actor_id, action_type, entity_type, entity_id,
                 before_state, after_state, details_json)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.actor_id)
        .bind(entry.action_type)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.before_state)
        .bind(&entry.after_state)
        .bind(&entry.details_json)
        .execute(conn)
        .await
        .map(|_| ())
    }

    /// Query audit logs with filtering and pagination, newest first.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditLog>, sqlx::Error> {
        let limit = params.limit.unwrap_or(50).min(500);
        let offset = params.offset.unwrap_or(0);

        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs
             WHERE ($1::BIGINT IS NULL OR actor_id = $1)
               AND ($2::TEXT IS NULL OR action_type = $2)
               AND ($3::TEXT IS NULL OR entity_type = $3)
               AND ($4::BIGINT IS NULL OR entity_id = $4)
             ORDER BY id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(params.actor_id)
            .bind(&params.action_type)
            .bind(&params.entity_type)
            .bind(params.entity_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count audit logs matching the given filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &AuditQuery) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM audit_logs
             WHERE ($1::BIGINT IS NULL OR actor_id = $1)
               AND ($2::TEXT IS NULL OR action_type = $2)
               AND ($3::TEXT IS NULL OR entity_type = $3)
               AND ($4::BIGINT IS NULL OR entity_id = $4)",
        )
        .bind(params.actor_id)
        .bind(&params.action_type)
        .bind(&params.entity_type)
        .bind(params.entity_id)
        .fetch_one(pool)
        .await
    }
}

//! Repository for the `custody_assignments` table.
//!
//! Assignment and release are transactional check-then-act operations: the
//! single-active-assignment and loan-lock invariants are validated against
//! freshly read rows inside the transaction, with the partial unique index
//! `uq_custody_assignments_active_asset` as the database-level backstop for
//! races.

use sqlx::PgPool;

use sgb_core::audit::{action_types, entity_types};
use sgb_core::error::CoreError;
use sgb_core::types::DbId;

use crate::models::assignment::{AssignmentDetail, CreateAssignment, CustodyAssignment};
use crate::models::audit::CreateAuditLog;
use crate::repositories::AuditLogRepo;
use crate::{is_unique_violation, DbError};

/// Column list for custody_assignments queries.
const COLUMNS: &str =
    "id, asset_id, custodian_id, location_id, loan_locked, unassigned_at, created_at";

/// Provides custody ledger operations.
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// Bind an asset to a custodian at a location.
    ///
    /// Fails with [`CoreError::AlreadyAssigned`] if the asset already has an
    /// active assignment; an administrator must release it first.
    pub async fn assign(
        pool: &PgPool,
        actor_id: DbId,
        input: &CreateAssignment,
    ) -> Result<CustodyAssignment, DbError> {
        let mut tx = pool.begin().await?;

        let asset_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM assets WHERE id = $1)",
        )
        .bind(input.asset_id)
        .fetch_one(&mut *tx)
        .await?;
        if !asset_exists {
            return Err(CoreError::NotFound {
                entity: "Asset",
                id: input.asset_id,
            }
            .into());
        }

        let active = sqlx::query_scalar::<_, Option<DbId>>(
            "SELECT id FROM custody_assignments
             WHERE asset_id = $1 AND unassigned_at IS NULL",
        )
        .bind(input.asset_id)
        .fetch_optional(&mut *tx)
        .await?
        .flatten();
        if active.is_some() {
            return Err(CoreError::AlreadyAssigned {
                asset_id: input.asset_id,
            }
            .into());
        }

        let query = format!(
            "INSERT INTO custody_assignments (asset_id, custodian_id, location_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let assignment = sqlx::query_as::<_, CustodyAssignment>(&query)
            .bind(input.asset_id)
            .bind(input.custodian_id)
            .bind(input.location_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| {
                // Lost a race against a concurrent assign for the same asset.
                if is_unique_violation(&err, "uq_custody_assignments_active_asset") {
                    DbError::Core(CoreError::AlreadyAssigned {
                        asset_id: input.asset_id,
                    })
                } else {
                    err.into()
                }
            })?;

        AuditLogRepo::insert(
            &mut tx,
            &CreateAuditLog {
                actor_id: Some(actor_id),
                action_type: action_types::ASSIGNMENT_CREATE,
                entity_type: Some(entity_types::CUSTODY_ASSIGNMENT),
                entity_id: Some(assignment.id),
                before_state: None,
                after_state: Some("active".into()),
                details_json: Some(serde_json::json!({
                    "asset_id": input.asset_id,
                    "custodian_id": input.custodian_id,
                    "location_id": input.location_id,
                })),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            assignment_id = assignment.id,
            asset_id = input.asset_id,
            custodian_id = input.custodian_id,
            "Custody assignment created"
        );

        Ok(assignment)
    }

    /// Release an active assignment.
    ///
    /// Fails with [`CoreError::AssetOnLoan`] while the assignment is
    /// loan-locked: an asset cannot be reassigned while physically checked
    /// out, even if its request is fully approved but not yet returned.
    pub async fn unassign(
        pool: &PgPool,
        actor_id: DbId,
        assignment_id: DbId,
    ) -> Result<CustodyAssignment, DbError> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM custody_assignments WHERE id = $1 FOR UPDATE"
        );
        let assignment = sqlx::query_as::<_, CustodyAssignment>(&query)
            .bind(assignment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "CustodyAssignment",
                id: assignment_id,
            })?;

        if assignment.unassigned_at.is_some() {
            return Err(CoreError::Validation(format!(
                "custody assignment {assignment_id} is no longer active"
            ))
            .into());
        }
        if assignment.loan_locked {
            return Err(CoreError::AssetOnLoan { assignment_id }.into());
        }

        let query = format!(
            "UPDATE custody_assignments SET unassigned_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let released = sqlx::query_as::<_, CustodyAssignment>(&query)
            .bind(assignment_id)
            .fetch_one(&mut *tx)
            .await?;

        AuditLogRepo::insert(
            &mut tx,
            &CreateAuditLog {
                actor_id: Some(actor_id),
                action_type: action_types::ASSIGNMENT_RELEASE,
                entity_type: Some(entity_types::CUSTODY_ASSIGNMENT),
                entity_id: Some(assignment_id),
                before_state: Some("active".into()),
                after_state: Some("released".into()),
                details_json: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(assignment_id, "Custody assignment released");

        Ok(released)
    }

    /// Find an assignment by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CustodyAssignment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM custody_assignments WHERE id = $1");
        sqlx::query_as::<_, CustodyAssignment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List active assignments joined with asset and custodian, optionally
    /// scoped to one custodian.
    pub async fn list_active(
        pool: &PgPool,
        custodian_id: Option<DbId>,
    ) -> Result<Vec<AssignmentDetail>, sqlx::Error> {
        sqlx::query_as::<_, AssignmentDetail>(
            "SELECT
                ca.id,
                ca.asset_id,
                a.serial,
                a.plate,
                a.brand,
                ca.custodian_id,
                u.first_name || ' ' || u.last_name AS custodian_name,
                l.name AS location_name,
                ca.loan_locked,
                ca.created_at
             FROM custody_assignments ca
             JOIN assets a ON a.id = ca.asset_id
             JOIN users u ON u.id = ca.custodian_id
             JOIN locations l ON l.id = ca.location_id
             WHERE ca.unassigned_at IS NULL
               AND ($1::BIGINT IS NULL OR ca.custodian_id = $1)
             ORDER BY a.plate ASC",
        )
        .bind(custodian_id)
        .fetch_all(pool)
        .await
    }
}

//! Repository for loan requests, their asset details, and signatures.
//!
//! The signature state machine lives in `sgb_core::workflow`; this module
//! re-reads persisted state inside a transaction, consults the pure rules,
//! and writes the transition plus its audit row atomically.

use std::collections::BTreeMap;

use sqlx::PgPool;

use sgb_core::audit::{action_types, entity_types};
use sgb_core::error::CoreError;
use sgb_core::types::DbId;
use sgb_core::workflow::{self, RequestState, SignerRole};

use crate::models::audit::CreateAuditLog;
use crate::models::request::{
    BatchAssignmentRow, CreateRequestBatch, CreatedRequest, LoanRequest, RequestSignature,
    RequestSummary,
};
use crate::repositories::AuditLogRepo;
use crate::{is_unique_violation, DbError};

/// Column list for loan_requests queries.
const COLUMNS: &str = "id, requester_id, custodian_id, start_date, end_date, \
    destination, reason, state, closed_at, created_at";

/// Column list for request_signatures queries.
const SIGNATURE_COLUMNS: &str = "id, request_id, role, signer_id, approved, comment, signed_at";

/// Provides the request lifecycle operations: submit, sign, cancel.
pub struct RequestRepo;

impl RequestRepo {
    /// Submit a batch of desired assets, creating one `PENDING` request per
    /// custodian group.
    ///
    /// Validation is atomic for the whole batch: any missing, inactive, or
    /// loan-locked assignment rejects the entire submission with
    /// [`CoreError::UnavailableAsset`] listing the offending plates, and
    /// nothing is created. Once validation passes, each per-custodian
    /// request commits in its own transaction; a failure in a later group
    /// does NOT roll back groups already committed. Partial progress across
    /// custodians is a deliberate product decision (see DESIGN.md) -- the
    /// caller gets an error naming the failed group while earlier requests
    /// stand.
    pub async fn submit_batch(
        pool: &PgPool,
        requester_id: DbId,
        input: &CreateRequestBatch,
    ) -> Result<Vec<CreatedRequest>, DbError> {
        workflow::validate_submission(
            &input.destination,
            &input.reason,
            input.start_date,
            input.end_date,
            input.assignment_ids.len(),
        )?;

        let rows = Self::load_batch_rows(pool, &input.assignment_ids).await?;
        Self::check_batch_available(&input.assignment_ids, &rows)?;

        // Group by custodian. BTreeMap keeps creation order deterministic.
        let mut groups: BTreeMap<DbId, Vec<DbId>> = BTreeMap::new();
        for row in &rows {
            groups.entry(row.custodian_id).or_default().push(row.id);
        }

        let mut created = Vec::with_capacity(groups.len());
        for (custodian_id, assignment_ids) in &groups {
            let request = Self::create_group_request(
                pool,
                requester_id,
                *custodian_id,
                assignment_ids,
                input,
            )
            .await
            .map_err(|err| {
                if !created.is_empty() {
                    tracing::warn!(
                        requester_id,
                        custodian_id,
                        committed = created.len(),
                        "Batch submission failed mid-way; earlier per-custodian requests remain committed"
                    );
                }
                err
            })?;
            created.push(CreatedRequest {
                id: request.id,
                custodian_id: *custodian_id,
                asset_count: assignment_ids.len(),
            });
        }

        Ok(created)
    }

    /// Record one role's signature and advance (or reject) the request.
    ///
    /// The strict custodian -> coordinator -> administrator ordering is
    /// enforced against the freshly locked request row; the
    /// `uq_request_signatures_role` constraint resolves concurrent attempts
    /// for the same slot to exactly one success.
    pub async fn sign(
        pool: &PgPool,
        request_id: DbId,
        role: SignerRole,
        signer_id: DbId,
        approve: bool,
        comment: Option<&str>,
    ) -> Result<LoanRequest, DbError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM loan_requests WHERE id = $1 FOR UPDATE");
        let request = sqlx::query_as::<_, LoanRequest>(&query)
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "LoanRequest",
                id: request_id,
            })?;

        let already = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM request_signatures WHERE request_id = $1 AND role = $2
             )",
        )
        .bind(request_id)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(CoreError::AlreadySigned {
                request_id,
                role: role.as_str().to_string(),
            }
            .into());
        }

        let current = RequestState::parse(&request.state)?;
        let next = workflow::apply_signature(request_id, current, role, approve)?;

        sqlx::query(
            "INSERT INTO request_signatures (request_id, role, signer_id, approved, comment)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(request_id)
        .bind(role.as_str())
        .bind(signer_id)
        .bind(approve)
        .bind(comment)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err, "uq_request_signatures_role") {
                DbError::Core(CoreError::AlreadySigned {
                    request_id,
                    role: role.as_str().to_string(),
                })
            } else {
                err.into()
            }
        })?;

        let query = format!(
            "UPDATE loan_requests SET state = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, LoanRequest>(&query)
            .bind(request_id)
            .bind(next.as_str())
            .fetch_one(&mut *tx)
            .await?;

        AuditLogRepo::insert(
            &mut tx,
            &CreateAuditLog {
                actor_id: Some(signer_id),
                action_type: action_types::REQUEST_SIGN,
                entity_type: Some(entity_types::LOAN_REQUEST),
                entity_id: Some(request_id),
                before_state: Some(current.as_str().into()),
                after_state: Some(next.as_str().into()),
                details_json: Some(serde_json::json!({
                    "role": role.as_str(),
                    "approve": approve,
                })),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id,
            signer_id,
            role = role.as_str(),
            approve,
            state = next.as_str(),
            "Request signature recorded"
        );

        Ok(updated)
    }

    /// Cancel a pending request. Only the original requester may cancel,
    /// and only while the request is still `PENDING`.
    pub async fn cancel(
        pool: &PgPool,
        request_id: DbId,
        caller_id: DbId,
    ) -> Result<LoanRequest, DbError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM loan_requests WHERE id = $1 FOR UPDATE");
        let request = sqlx::query_as::<_, LoanRequest>(&query)
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "LoanRequest",
                id: request_id,
            })?;

        let current = RequestState::parse(&request.state)?;
        workflow::validate_cancel(request_id, current, request.requester_id, caller_id)?;

        let query = format!(
            "UPDATE loan_requests SET state = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, LoanRequest>(&query)
            .bind(request_id)
            .bind(RequestState::Cancelled.as_str())
            .fetch_one(&mut *tx)
            .await?;

        AuditLogRepo::insert(
            &mut tx,
            &CreateAuditLog {
                actor_id: Some(caller_id),
                action_type: action_types::REQUEST_CANCEL,
                entity_type: Some(entity_types::LOAN_REQUEST),
                entity_id: Some(request_id),
                before_state: Some(current.as_str().into()),
                after_state: Some(RequestState::Cancelled.as_str().into()),
                details_json: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(request_id, caller_id, "Request cancelled");

        Ok(updated)
    }

    /// Find a request by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<LoanRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM loan_requests WHERE id = $1");
        sqlx::query_as::<_, LoanRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List request summaries, optionally scoped to one requester, one
    /// custodian, or one state. Newest first.
    pub async fn list(
        pool: &PgPool,
        requester_id: Option<DbId>,
        custodian_id: Option<DbId>,
        state: Option<&str>,
    ) -> Result<Vec<RequestSummary>, sqlx::Error> {
        sqlx::query_as::<_, RequestSummary>(
            "SELECT
                r.id,
                r.requester_id,
                u.first_name || ' ' || u.last_name AS requester_name,
                r.custodian_id,
                r.start_date,
                r.end_date,
                r.destination,
                r.reason,
                r.state,
                r.closed_at,
                r.created_at,
                (SELECT COUNT(*) FROM request_signatures s
                  WHERE s.request_id = r.id AND s.approved) AS approvals
             FROM loan_requests r
             JOIN users u ON u.id = r.requester_id
             WHERE ($1::BIGINT IS NULL OR r.requester_id = $1)
               AND ($2::BIGINT IS NULL OR r.custodian_id = $2)
               AND ($3::TEXT IS NULL OR r.state = $3)
             ORDER BY r.id DESC",
        )
        .bind(requester_id)
        .bind(custodian_id)
        .bind(state)
        .fetch_all(pool)
        .await
    }

    /// List all signatures of a request in role order.
    pub async fn signatures(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<RequestSignature>, sqlx::Error> {
        let query = format!(
            "SELECT {SIGNATURE_COLUMNS} FROM request_signatures
             WHERE request_id = $1
             ORDER BY signed_at ASC"
        );
        sqlx::query_as::<_, RequestSignature>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    /// Assignment ids referenced by a request.
    pub async fn assignment_ids(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT assignment_id FROM request_assets WHERE request_id = $1 ORDER BY assignment_id",
        )
        .bind(request_id)
        .fetch_all(pool)
        .await
    }

    // -- internal helpers ---------------------------------------------------

    /// Load the referenced assignments with availability flags and plates.
    async fn load_batch_rows(
        pool: &PgPool,
        assignment_ids: &[DbId],
    ) -> Result<Vec<BatchAssignmentRow>, DbError> {
        let rows = sqlx::query_as::<_, BatchAssignmentRow>(
            "SELECT
                ca.id,
                ca.custodian_id,
                ca.loan_locked,
                (ca.unassigned_at IS NULL) AS active,
                a.plate
             FROM custody_assignments ca
             JOIN assets a ON a.id = ca.asset_id
             WHERE ca.id = ANY($1)",
        )
        .bind(assignment_ids)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Pre-commit availability check for the whole batch. Missing, released,
    /// and loan-locked assignments all reject the submission as a unit.
    fn check_batch_available(
        requested: &[DbId],
        rows: &[BatchAssignmentRow],
    ) -> Result<(), CoreError> {
        let mut offending: Vec<String> = requested
            .iter()
            .filter(|id| !rows.iter().any(|r| r.id == **id))
            .map(|id| format!("assignment {id}"))
            .collect();
        for row in rows {
            if !row.active || row.loan_locked {
                offending.push(row.plate.clone());
            }
        }
        if !offending.is_empty() {
            return Err(CoreError::UnavailableAsset { plates: offending });
        }
        Ok(())
    }

    /// Create one per-custodian request in its own transaction. Re-locks the
    /// group's assignments and re-checks availability, since the batch-level
    /// validation ran outside this transaction.
    async fn create_group_request(
        pool: &PgPool,
        requester_id: DbId,
        custodian_id: DbId,
        assignment_ids: &[DbId],
        input: &CreateRequestBatch,
    ) -> Result<LoanRequest, DbError> {
        let mut tx = pool.begin().await?;

        let rows = sqlx::query_as::<_, BatchAssignmentRow>(
            "SELECT
                ca.id,
                ca.custodian_id,
                ca.loan_locked,
                (ca.unassigned_at IS NULL) AS active,
                a.plate
             FROM custody_assignments ca
             JOIN assets a ON a.id = ca.asset_id
             WHERE ca.id = ANY($1)
             FOR UPDATE OF ca",
        )
        .bind(assignment_ids)
        .fetch_all(&mut *tx)
        .await?;
        Self::check_batch_available(assignment_ids, &rows)?;

        let query = format!(
            "INSERT INTO loan_requests
                (requester_id, custodian_id, start_date, end_date, destination, reason, state)
             VALUES ($1, $2, $3, $4, $5, $6, 'pending')
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, LoanRequest>(&query)
            .bind(requester_id)
            .bind(custodian_id)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.destination)
            .bind(&input.reason)
            .fetch_one(&mut *tx)
            .await?;

        for assignment_id in assignment_ids {
            sqlx::query("INSERT INTO request_assets (request_id, assignment_id) VALUES ($1, $2)")
                .bind(request.id)
                .bind(assignment_id)
                .execute(&mut *tx)
                .await?;
        }

        AuditLogRepo::insert(
            &mut tx,
            &CreateAuditLog {
                actor_id: Some(requester_id),
                action_type: action_types::REQUEST_SUBMIT,
                entity_type: Some(entity_types::LOAN_REQUEST),
                entity_id: Some(request.id),
                before_state: None,
                after_state: Some(RequestState::Pending.as_str().into()),
                details_json: Some(serde_json::json!({
                    "custodian_id": custodian_id,
                    "assignment_ids": assignment_ids,
                })),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = request.id,
            requester_id,
            custodian_id,
            assets = assignment_ids.len(),
            "Loan request created"
        );

        Ok(request)
    }
}

//! Repository for the gate ledger: exit/re-entry events and the derived
//! physical state of assets.
//!
//! Movement validation lives in `sgb_core::gate`; this module locks the
//! request row, feeds the pure rules the freshly read asset sets, and
//! writes the event rows, the loan-lock flags, and the audit row in one
//! transaction.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use sgb_core::audit::{action_types, entity_types};
use sgb_core::error::CoreError;
use sgb_core::gate::{self, AssetMovement, GateDirection, PhysicalState, RequestAssetRef};
use sgb_core::types::DbId;
use sgb_core::workflow::RequestState;

use crate::models::audit::CreateAuditLog;
use crate::models::gate::{
    GateAuthorization, GateEvent, GateEventAsset, GateEventDetail, GateEventSummary, MovementRow,
    RecordExit, RecordReentry,
};
use crate::models::request::{LoanRequest, RequestAssetState};
use crate::repositories::AuditLogRepo;
use crate::DbError;

/// Column list for gate_events queries.
const EVENT_COLUMNS: &str = "id, request_id, guard_id, direction, observations, created_at";

/// Column list for loan_requests (FOR UPDATE reads).
const REQUEST_COLUMNS: &str = "id, requester_id, custodian_id, start_date, end_date, \
    destination, reason, state, closed_at, created_at";

/// Provides the gate ledger operations.
pub struct GateRepo;

impl GateRepo {
    /// Record the one-time exit of a request's assets through the gate.
    ///
    /// The request must be `APPROVED` and must not already have an exit
    /// event. Assets actually leaving become off-site and their custody
    /// assignments get loan-locked; assets staying behind keep their
    /// availability and are recorded with the stated reason for audit.
    pub async fn record_exit(
        pool: &PgPool,
        request_id: DbId,
        guard_id: DbId,
        input: &RecordExit,
    ) -> Result<GateEvent, DbError> {
        let mut tx = pool.begin().await?;

        let request = Self::lock_request(&mut tx, request_id).await?;
        let state = RequestState::parse(&request.state)?;
        if state != RequestState::Approved {
            return Err(CoreError::RequestNotApproved {
                request_id,
                state: state.as_str().to_string(),
            }
            .into());
        }

        let has_exit = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM gate_events WHERE request_id = $1 AND direction = 'exit'
             )",
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;
        if has_exit {
            return Err(CoreError::DuplicateGateAction {
                request_id,
                direction: GateDirection::Exit.as_str().to_string(),
            }
            .into());
        }

        let request_assets = Self::request_asset_refs(&mut tx, request_id).await?;
        let stay_reasons: HashMap<DbId, String> = input
            .stay_reasons
            .iter()
            .map(|r| (r.assignment_id, r.reason.clone()))
            .collect();
        let plan = gate::plan_exit(&request_assets, &input.assets_leaving, &stay_reasons)?;

        let query = format!(
            "INSERT INTO gate_events (request_id, guard_id, direction, observations)
             VALUES ($1, $2, 'exit', $3)
             RETURNING {EVENT_COLUMNS}"
        );
        let event = sqlx::query_as::<_, GateEvent>(&query)
            .bind(request_id)
            .bind(guard_id)
            .bind(&input.observations)
            .fetch_one(&mut *tx)
            .await?;

        for assignment_id in &plan.leaving {
            Self::insert_event_asset(&mut tx, event.id, *assignment_id, AssetMovement::Exited, None)
                .await?;
        }
        for (assignment_id, reason) in &plan.staying {
            Self::insert_event_asset(
                &mut tx,
                event.id,
                *assignment_id,
                AssetMovement::Stayed,
                Some(reason.as_str()),
            )
            .await?;
        }

        sqlx::query("UPDATE custody_assignments SET loan_locked = TRUE WHERE id = ANY($1)")
            .bind(&plan.leaving)
            .execute(&mut *tx)
            .await?;

        AuditLogRepo::insert(
            &mut tx,
            &CreateAuditLog {
                actor_id: Some(guard_id),
                action_type: action_types::GATE_EXIT,
                entity_type: Some(entity_types::LOAN_REQUEST),
                entity_id: Some(request_id),
                before_state: Some("on_site".into()),
                after_state: Some("off_site".into()),
                details_json: Some(serde_json::json!({
                    "gate_event_id": event.id,
                    "left": plan.leaving,
                    "stayed": plan.staying.iter().map(|(id, _)| id).collect::<Vec<_>>(),
                })),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id,
            guard_id,
            gate_event_id = event.id,
            left = plan.leaving.len(),
            stayed = plan.staying.len(),
            "Gate exit recorded"
        );

        Ok(event)
    }

    /// Record the return of off-site assets through the gate.
    ///
    /// Only assets currently off-site under the request may return. Each
    /// returning asset's loan-lock is cleared; once every exited asset has
    /// returned, the request's loan cycle closes. Partial re-entry is
    /// allowed and leaves the cycle open.
    pub async fn record_reentry(
        pool: &PgPool,
        request_id: DbId,
        guard_id: DbId,
        input: &RecordReentry,
    ) -> Result<GateEvent, DbError> {
        let mut tx = pool.begin().await?;

        let request = Self::lock_request(&mut tx, request_id).await?;
        let state = RequestState::parse(&request.state)?;
        if state != RequestState::Approved {
            return Err(CoreError::RequestNotApproved {
                request_id,
                state: state.as_str().to_string(),
            }
            .into());
        }

        let off_site = Self::off_site_asset_refs(&mut tx, request_id).await?;
        let returning = gate::plan_reentry(&off_site, &input.assets_returning)?;

        let query = format!(
            "INSERT INTO gate_events (request_id, guard_id, direction, observations)
             VALUES ($1, $2, 'reentry', $3)
             RETURNING {EVENT_COLUMNS}"
        );
        let event = sqlx::query_as::<_, GateEvent>(&query)
            .bind(request_id)
            .bind(guard_id)
            .bind(&input.observations)
            .fetch_one(&mut *tx)
            .await?;

        for assignment_id in &returning {
            Self::insert_event_asset(
                &mut tx,
                event.id,
                *assignment_id,
                AssetMovement::Returned,
                None,
            )
            .await?;
        }

        sqlx::query("UPDATE custody_assignments SET loan_locked = FALSE WHERE id = ANY($1)")
            .bind(&returning)
            .execute(&mut *tx)
            .await?;

        // The cycle closes when nothing remains off-site.
        let all_back = returning.len() == off_site.len();
        if all_back {
            sqlx::query("UPDATE loan_requests SET closed_at = NOW() WHERE id = $1")
                .bind(request_id)
                .execute(&mut *tx)
                .await?;
        }

        AuditLogRepo::insert(
            &mut tx,
            &CreateAuditLog {
                actor_id: Some(guard_id),
                action_type: action_types::GATE_REENTRY,
                entity_type: Some(entity_types::LOAN_REQUEST),
                entity_id: Some(request_id),
                before_state: Some("off_site".into()),
                after_state: Some(if all_back { "closed" } else { "partial_return" }.into()),
                details_json: Some(serde_json::json!({
                    "gate_event_id": event.id,
                    "returned": returning,
                })),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id,
            guard_id,
            gate_event_id = event.id,
            returned = returning.len(),
            closed = all_back,
            "Gate re-entry recorded"
        );

        Ok(event)
    }

    /// Approved requests for the guard's authorization list, with whether
    /// their exit already happened. Closed cycles are excluded.
    pub async fn authorizations(pool: &PgPool) -> Result<Vec<GateAuthorization>, sqlx::Error> {
        sqlx::query_as::<_, GateAuthorization>(
            "SELECT
                r.id AS request_id,
                u.first_name || ' ' || u.last_name AS requester_name,
                r.destination,
                r.state,
                (SELECT COUNT(*) FROM request_assets ra WHERE ra.request_id = r.id)
                    AS asset_count,
                EXISTS(
                    SELECT 1 FROM gate_events ge
                    WHERE ge.request_id = r.id AND ge.direction = 'exit'
                ) AS has_exit,
                r.created_at
             FROM loan_requests r
             JOIN users u ON u.id = r.requester_id
             WHERE r.state = 'approved' AND r.closed_at IS NULL
             ORDER BY r.id DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Gate events joined with guard identity, newest first.
    pub async fn list_events(pool: &PgPool) -> Result<Vec<GateEventSummary>, sqlx::Error> {
        sqlx::query_as::<_, GateEventSummary>(
            "SELECT
                ge.id,
                ge.request_id,
                ge.guard_id,
                u.first_name || ' ' || u.last_name AS guard_name,
                ge.direction,
                ge.observations,
                (SELECT COUNT(*) FROM gate_event_assets gea
                  WHERE gea.gate_event_id = ge.id) AS asset_count,
                ge.created_at
             FROM gate_events ge
             JOIN users u ON u.id = ge.guard_id
             ORDER BY ge.id DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// One gate event with its per-asset movement rows, or `None` if the
    /// event does not exist.
    pub async fn event_detail(
        pool: &PgPool,
        event_id: DbId,
    ) -> Result<Option<GateEventDetail>, sqlx::Error> {
        let event = sqlx::query_as::<_, GateEventSummary>(
            "SELECT
                ge.id,
                ge.request_id,
                ge.guard_id,
                u.first_name || ' ' || u.last_name AS guard_name,
                ge.direction,
                ge.observations,
                (SELECT COUNT(*) FROM gate_event_assets gea
                  WHERE gea.gate_event_id = ge.id) AS asset_count,
                ge.created_at
             FROM gate_events ge
             JOIN users u ON u.id = ge.guard_id
             WHERE ge.id = $1",
        )
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
        let Some(event) = event else {
            return Ok(None);
        };

        let assets = sqlx::query_as::<_, GateEventAsset>(
            "SELECT id, gate_event_id, assignment_id, movement, stay_reason
             FROM gate_event_assets
             WHERE gate_event_id = $1
             ORDER BY assignment_id",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await?;

        Ok(Some(GateEventDetail { event, assets }))
    }

    /// Derived physical state of every asset in a request.
    pub async fn asset_states(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<RequestAssetState>, DbError> {
        #[derive(sqlx::FromRow)]
        struct AssetRow {
            assignment_id: DbId,
            asset_id: DbId,
            serial: String,
            plate: String,
        }

        let assets = sqlx::query_as::<_, AssetRow>(
            "SELECT ra.assignment_id, a.id AS asset_id, a.serial, a.plate
             FROM request_assets ra
             JOIN custody_assignments ca ON ca.id = ra.assignment_id
             JOIN assets a ON a.id = ca.asset_id
             WHERE ra.request_id = $1
             ORDER BY a.plate",
        )
        .bind(request_id)
        .fetch_all(pool)
        .await?;

        let movements = sqlx::query_as::<_, MovementRow>(
            "SELECT gea.assignment_id, gea.movement
             FROM gate_event_assets gea
             JOIN gate_events ge ON ge.id = gea.gate_event_id
             WHERE ge.request_id = $1
             ORDER BY ge.id ASC, gea.id ASC",
        )
        .bind(request_id)
        .fetch_all(pool)
        .await?;

        let mut by_assignment: HashMap<DbId, Vec<AssetMovement>> = HashMap::new();
        for row in &movements {
            by_assignment
                .entry(row.assignment_id)
                .or_default()
                .push(AssetMovement::parse(&row.movement)?);
        }

        Ok(assets
            .into_iter()
            .map(|a| {
                let history = by_assignment.remove(&a.assignment_id).unwrap_or_default();
                RequestAssetState {
                    assignment_id: a.assignment_id,
                    asset_id: a.asset_id,
                    serial: a.serial,
                    plate: a.plate,
                    physical_state: gate::derive_physical_state(&history),
                }
            })
            .collect())
    }

    /// Derived physical state of one asset under one request (test and
    /// detail-view helper).
    pub async fn asset_state(
        pool: &PgPool,
        request_id: DbId,
        assignment_id: DbId,
    ) -> Result<PhysicalState, DbError> {
        let rows = sqlx::query_as::<_, MovementRow>(
            "SELECT gea.assignment_id, gea.movement
             FROM gate_event_assets gea
             JOIN gate_events ge ON ge.id = gea.gate_event_id
             WHERE ge.request_id = $1 AND gea.assignment_id = $2
             ORDER BY ge.id ASC, gea.id ASC",
        )
        .bind(request_id)
        .bind(assignment_id)
        .fetch_all(pool)
        .await?;

        let mut history = Vec::with_capacity(rows.len());
        for row in &rows {
            history.push(AssetMovement::parse(&row.movement)?);
        }
        Ok(gate::derive_physical_state(&history))
    }

    // -- internal helpers ---------------------------------------------------

    async fn lock_request(
        conn: &mut PgConnection,
        request_id: DbId,
    ) -> Result<LoanRequest, DbError> {
        let query = format!("SELECT {REQUEST_COLUMNS} FROM loan_requests WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, LoanRequest>(&query)
            .bind(request_id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| {
                DbError::Core(CoreError::NotFound {
                    entity: "LoanRequest",
                    id: request_id,
                })
            })
    }

    async fn request_asset_refs(
        conn: &mut PgConnection,
        request_id: DbId,
    ) -> Result<Vec<RequestAssetRef>, DbError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            assignment_id: DbId,
            plate: String,
        }
        let rows = sqlx::query_as::<_, Row>(
            "SELECT ra.assignment_id, a.plate
             FROM request_assets ra
             JOIN custody_assignments ca ON ca.id = ra.assignment_id
             JOIN assets a ON a.id = ca.asset_id
             WHERE ra.request_id = $1
             ORDER BY ra.assignment_id",
        )
        .bind(request_id)
        .fetch_all(conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| RequestAssetRef {
                assignment_id: r.assignment_id,
                plate: r.plate,
            })
            .collect())
    }

    /// Assets that exited under this request and have not yet returned.
    async fn off_site_asset_refs(
        conn: &mut PgConnection,
        request_id: DbId,
    ) -> Result<Vec<RequestAssetRef>, DbError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            assignment_id: DbId,
            plate: String,
        }
        let rows = sqlx::query_as::<_, Row>(
            "SELECT gea.assignment_id, a.plate
             FROM gate_event_assets gea
             JOIN gate_events ge ON ge.id = gea.gate_event_id
             JOIN custody_assignments ca ON ca.id = gea.assignment_id
             JOIN assets a ON a.id = ca.asset_id
             WHERE ge.request_id = $1
               AND gea.movement = 'exited'
               AND NOT EXISTS (
                    SELECT 1 FROM gate_event_assets g2
                    JOIN gate_events e2 ON e2.id = g2.gate_event_id
                    WHERE e2.request_id = ge.request_id
                      AND g2.assignment_id = gea.assignment_id
                      AND g2.movement = 'returned'
               )
             ORDER BY gea.assignment_id",
        )
        .bind(request_id)
        .fetch_all(conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| RequestAssetRef {
                assignment_id: r.assignment_id,
                plate: r.plate,
            })
            .collect())
    }

    async fn insert_event_asset(
        conn: &mut PgConnection,
        gate_event_id: DbId,
        assignment_id: DbId,
        movement: AssetMovement,
        stay_reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO gate_event_assets (gate_event_id, assignment_id, movement, stay_reason)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(gate_event_id)
        .bind(assignment_id)
        .bind(movement.as_str())
        .bind(stay_reason)
        .execute(conn)
        .await
        .map(|_| ())
    }
}

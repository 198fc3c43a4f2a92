//! Gate ledger models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sgb_core::types::{DbId, Timestamp};

/// A row from the `gate_events` table. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GateEvent {
    pub id: DbId,
    pub request_id: DbId,
    pub guard_id: DbId,
    pub direction: String,
    pub observations: Option<String>,
    pub created_at: Timestamp,
}

/// A per-asset movement row under one gate event.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GateEventAsset {
    pub id: DbId,
    pub gate_event_id: DbId,
    pub assignment_id: DbId,
    pub movement: String,
    pub stay_reason: Option<String>,
}

/// Reason an asset stays behind on a partial exit.
#[derive(Debug, Clone, Deserialize)]
pub struct StayReason {
    pub assignment_id: DbId,
    pub reason: String,
}

/// Request body for recording an exit.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordExit {
    /// Assignment ids of the assets actually leaving.
    pub assets_leaving: Vec<DbId>,
    /// Mandatory for each asset left behind when the request has more than
    /// one asset.
    #[serde(default)]
    pub stay_reasons: Vec<StayReason>,
    pub observations: Option<String>,
}

/// Request body for recording a re-entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordReentry {
    /// Assignment ids of the assets returning.
    pub assets_returning: Vec<DbId>,
    pub observations: Option<String>,
}

/// An approved, not-yet-closed request awaiting gate action, for the
/// guard's authorization list.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GateAuthorization {
    pub request_id: DbId,
    pub requester_name: String,
    pub destination: String,
    pub state: String,
    pub asset_count: i64,
    pub has_exit: bool,
    pub created_at: Timestamp,
}

/// A gate event joined with its request and guard for the audit-trail view.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GateEventSummary {
    pub id: DbId,
    pub request_id: DbId,
    pub guard_id: DbId,
    pub guard_name: String,
    pub direction: String,
    pub observations: Option<String>,
    pub asset_count: i64,
    pub created_at: Timestamp,
}

/// One gate event with its per-asset movement rows, for the ledger detail
/// view.
#[derive(Debug, Clone, Serialize)]
pub struct GateEventDetail {
    #[serde(flatten)]
    pub event: GateEventSummary,
    pub assets: Vec<GateEventAsset>,
}

/// Internal row: one movement of one assignment, in event order.
#[derive(Debug, Clone, FromRow)]
pub struct MovementRow {
    pub assignment_id: DbId,
    pub movement: String,
}

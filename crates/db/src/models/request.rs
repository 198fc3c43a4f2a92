//! Loan request models and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sgb_core::types::{DbId, Timestamp};

/// A row from the `loan_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LoanRequest {
    pub id: DbId,
    pub requester_id: DbId,
    pub custodian_id: DbId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: String,
    pub reason: String,
    pub state: String,
    pub closed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Request body for submitting a batch of desired assets.
///
/// The batch is grouped by current custodian; one request is created per
/// custodian group.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestBatch {
    /// Custody assignment ids selected by the requester.
    pub assignment_ids: Vec<DbId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: String,
    pub reason: String,
}

/// One request created from a submission batch.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRequest {
    pub id: DbId,
    pub custodian_id: DbId,
    pub asset_count: usize,
}

/// Request body for the sign endpoint. The signing role is taken from the
/// caller's verified active role, never from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct SignRequest {
    pub approve: bool,
    pub comment: Option<String>,
}

/// A row from the `request_signatures` table. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestSignature {
    pub id: DbId,
    pub request_id: DbId,
    pub role: String,
    pub signer_id: DbId,
    pub approved: bool,
    pub comment: Option<String>,
    pub signed_at: Timestamp,
}

/// Request listing row joined with requester identity and signature count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestSummary {
    pub id: DbId,
    pub requester_id: DbId,
    pub requester_name: String,
    pub custodian_id: DbId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: String,
    pub reason: String,
    pub state: String,
    pub closed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub approvals: i64,
}

/// One asset of a request with its derived physical state.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAssetState {
    pub assignment_id: DbId,
    pub asset_id: DbId,
    pub serial: String,
    pub plate: String,
    pub physical_state: sgb_core::gate::PhysicalState,
}

/// Full detail of a request: the row, its assets with physical state, and
/// its signature set.
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: LoanRequest,
    pub assets: Vec<RequestAssetState>,
    pub signatures: Vec<RequestSignature>,
}

/// Internal row used while grouping a submission batch by custodian.
#[derive(Debug, Clone, FromRow)]
pub struct BatchAssignmentRow {
    pub id: DbId,
    pub custodian_id: DbId,
    pub loan_locked: bool,
    pub active: bool,
    pub plate: String,
}

//! Custody assignment models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sgb_core::types::{DbId, Timestamp};

/// A row from the `custody_assignments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustodyAssignment {
    pub id: DbId,
    pub asset_id: DbId,
    pub custodian_id: DbId,
    pub location_id: DbId,
    pub loan_locked: bool,
    pub unassigned_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for assigning an asset to a custodian.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssignment {
    pub asset_id: DbId,
    pub custodian_id: DbId,
    pub location_id: DbId,
}

/// Assignment joined with its asset and custodian for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssignmentDetail {
    pub id: DbId,
    pub asset_id: DbId,
    pub serial: String,
    pub plate: String,
    pub brand: String,
    pub custodian_id: DbId,
    pub custodian_name: String,
    pub location_name: String,
    pub loan_locked: bool,
    pub created_at: Timestamp,
}

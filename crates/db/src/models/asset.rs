//! Asset registry models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sgb_core::types::{DbId, Timestamp};

/// A row from the `assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    pub id: DbId,
    pub serial: String,
    pub plate: String,
    pub brand: String,
    pub model: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new asset.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAsset {
    pub serial: String,
    pub plate: String,
    pub brand: String,
    pub model: Option<String>,
    pub description: Option<String>,
}

/// DTO for administrative correction of descriptive attributes. Identity
/// fields (serial, plate) are immutable after registration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAsset {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
}

/// An asset that is loanable right now: active custody assignment, not
/// loan-locked. Joined view used by the requester's selection screen.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailableAsset {
    pub assignment_id: DbId,
    pub asset_id: DbId,
    pub serial: String,
    pub plate: String,
    pub brand: String,
    pub model: Option<String>,
    pub custodian_id: DbId,
    pub custodian_name: String,
    pub location_name: String,
}

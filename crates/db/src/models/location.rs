//! Location entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sgb_core::types::{DbId, Timestamp};

/// A row from the `locations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Location {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a new location.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocation {
    pub name: String,
    pub description: Option<String>,
}

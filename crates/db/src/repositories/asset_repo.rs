//! Repository for the `assets` table.

use sqlx::PgPool;

use sgb_core::types::DbId;

use crate::models::asset::{Asset, AvailableAsset, CreateAsset, UpdateAsset};

/// Column list for assets queries.
const COLUMNS: &str = "id, serial, plate, brand, model, description, created_at, updated_at";

/// Provides registry operations for assets.
pub struct AssetRepo;

impl AssetRepo {
    /// Register a new asset, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateAsset) -> Result<Asset, sqlx::Error> {
        let query = format!(
            "INSERT INTO assets (serial, plate, brand, model, description)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(&input.serial)
            .bind(&input.plate)
            .bind(&input.brand)
            .bind(&input.model)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Administrative correction of descriptive attributes. Identity fields
    /// (serial, plate) are never updated here.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAsset,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!(
            "UPDATE assets SET
                brand = COALESCE($2, brand),
                model = COALESCE($3, model),
                description = COALESCE($4, description),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .bind(&input.brand)
            .bind(&input.model)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Find an asset by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all registered assets ordered by plate.
    pub async fn list(pool: &PgPool) -> Result<Vec<Asset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assets ORDER BY plate ASC");
        sqlx::query_as::<_, Asset>(&query).fetch_all(pool).await
    }

    /// Assets that can be requested right now: active custody assignment
    /// and not loan-locked.
    pub async fn list_available(pool: &PgPool) -> Result<Vec<AvailableAsset>, sqlx::Error> {
        sqlx::query_as::<_, AvailableAsset>(
            "SELECT
                ca.id AS assignment_id,
                a.id AS asset_id,
                a.serial,
                a.plate,
                a.brand,
                a.model,
                ca.custodian_id,
                u.first_name || ' ' || u.last_name AS custodian_name,
                l.name AS location_name
             FROM custody_assignments ca
             JOIN assets a ON a.id = ca.asset_id
             JOIN users u ON u.id = ca.custodian_id
             JOIN locations l ON l.id = ca.location_id
             WHERE ca.unassigned_at IS NULL
               AND ca.loan_locked = FALSE
             ORDER BY a.plate ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Assets with no active custody assignment, for the warehouse
    /// assignment screen.
    pub async fn list_unassigned(pool: &PgPool) -> Result<Vec<Asset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assets a
             WHERE NOT EXISTS (
                SELECT 1 FROM custody_assignments ca
                WHERE ca.asset_id = a.id AND ca.unassigned_at IS NULL
             )
             ORDER BY a.plate ASC"
        );
        sqlx::query_as::<_, Asset>(&query).fetch_all(pool).await
    }

    /// Next sequential plate number: the highest numeric plate plus one.
    /// Non-numeric plates are ignored.
    pub async fn next_plate(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(plate::BIGINT), 0) + 1
             FROM assets
             WHERE plate ~ '^[0-9]+$'",
        )
        .fetch_one(pool)
        .await
    }
}

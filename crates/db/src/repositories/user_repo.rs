//! Repository for the `users` and `user_roles` tables.

use sqlx::PgPool;

use sgb_core::types::DbId;

use crate::models::user::{CreateUser, User};

/// Column list for users queries.
const COLUMNS: &str = "id, document, first_name, last_name, email, password_hash, \
    is_active, created_at, updated_at";

/// Provides CRUD and role-membership operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (document, first_name, last_name, email, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.document)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a user by their internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by their national document number.
    pub async fn find_by_document(
        pool: &PgPool,
        document: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE document = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(document)
            .fetch_optional(pool)
            .await
    }

    /// All role names the user holds, ordered by role id.
    pub async fn roles_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = $1
             ORDER BY r.id ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Whether the user holds the named role.
    ///
    /// This is the persisted check behind every privileged operation: a
    /// role claimed in a session token is never sufficient on its own.
    pub async fn has_role(pool: &PgPool, user_id: DbId, role: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                WHERE ur.user_id = $1 AND r.name = $2
             )",
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Grant a role to a user. A duplicate grant is a no-op.
    pub async fn grant_role(pool: &PgPool, user_id: DbId, role: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE name = $2
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await
        .map(|_| ())
    }
}

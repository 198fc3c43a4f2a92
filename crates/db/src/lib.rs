//! PostgreSQL persistence layer for the asset loan workflow.
//!
//! Repositories come in two kinds: plain catalog CRUD (assets, users,
//! roles, locations) returning `sqlx::Error`, and transactional workflow
//! operations (requests, signatures, gate events, custody assignments)
//! returning [`DbError`]. Every workflow operation runs in one transaction
//! that re-reads current state under row locks, validates the transition
//! through `sgb_core`, and writes the new state plus its audit row, rolling
//! back entirely on any failure.

use sqlx::postgres::PgPoolOptions;

use sgb_core::error::CoreError;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database connection is usable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Apply all pending embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Error type for transactional workflow operations.
///
/// Wraps the domain taxonomy for rule violations and `sqlx::Error` for
/// everything the database reports on its own.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

/// PostgreSQL SQLSTATE codes for transient transaction failures.
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for DbError {
    /// Remap serialization failures and deadlocks to [`CoreError::Retryable`]
    /// so callers see a transient error that is safe to retry; everything
    /// else passes through unchanged.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if matches!(
                db_err.code().as_deref(),
                Some(SQLSTATE_SERIALIZATION_FAILURE) | Some(SQLSTATE_DEADLOCK_DETECTED)
            ) {
                return DbError::Core(CoreError::Retryable(db_err.message().to_string()));
            }
        }
        DbError::Sqlx(err)
    }
}

/// Whether a sqlx error is a unique-constraint violation on the named
/// constraint. Used to convert races lost at the database level (duplicate
/// signature, concurrent assignment) into their domain errors.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(constraint);
    }
    false
}

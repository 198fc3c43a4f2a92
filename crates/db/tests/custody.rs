//! Integration tests for the asset registry and custody ledger.
//!
//! Exercises assignment lifecycle against a real database:
//! - One active assignment per asset
//! - Loan-lock blocking release
//! - Availability and unassigned views
//! - Sequential plate suggestion

use assert_matches::assert_matches;
use sqlx::PgPool;

use sgb_core::error::CoreError;
use sgb_core::roles;
use sgb_db::models::asset::{CreateAsset, UpdateAsset};
use sgb_db::models::assignment::CreateAssignment;
use sgb_db::models::audit::AuditQuery;
use sgb_db::models::location::CreateLocation;
use sgb_db::models::user::CreateUser;
use sgb_db::repositories::{AssetRepo, AssignmentRepo, AuditLogRepo, LocationRepo, UserRepo};
use sgb_db::DbError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, document: &str, name: &str, roles: &[&str]) -> i64 {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            document: document.to_string(),
            first_name: name.to_string(),
            last_name: "Test".to_string(),
            email: format!("{document}@example.com"),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$placeholder".to_string(),
        },
    )
    .await
    .unwrap();
    for role in roles {
        UserRepo::grant_role(pool, user.id, role).await.unwrap();
    }
    user.id
}

async fn seed_location(pool: &PgPool, name: &str) -> i64 {
    LocationRepo::create(
        pool,
        &CreateLocation {
            name: name.to_string(),
            description: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn new_asset(serial: &str, plate: &str) -> CreateAsset {
    CreateAsset {
        serial: serial.to_string(),
        plate: plate.to_string(),
        brand: "HP".to_string(),
        model: Some("EliteBook".to_string()),
        description: None,
    }
}

// ---------------------------------------------------------------------------
// Test: Asset registry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_create_and_update_asset(pool: PgPool) {
    let asset = AssetRepo::create(&pool, &new_asset("SN-100", "4100"))
        .await
        .unwrap();
    assert_eq!(asset.serial, "SN-100");
    assert_eq!(asset.plate, "4100");

    let updated = AssetRepo::update(
        &pool,
        asset.id,
        &UpdateAsset {
            brand: Some("Hewlett-Packard".to_string()),
            model: None,
            description: Some("Reimaged 2026-08".to_string()),
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.brand, "Hewlett-Packard");
    // Untouched fields keep their values.
    assert_eq!(updated.model.as_deref(), Some("EliteBook"));
    assert_eq!(updated.serial, "SN-100");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_serial_rejected(pool: PgPool) {
    AssetRepo::create(&pool, &new_asset("SN-100", "4100"))
        .await
        .unwrap();
    let err = AssetRepo::create(&pool, &new_asset("SN-100", "4101"))
        .await
        .unwrap_err();
    assert_matches!(err, sqlx::Error::Database(_));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_next_plate_skips_non_numeric(pool: PgPool) {
    assert_eq!(AssetRepo::next_plate(&pool).await.unwrap(), 1);

    AssetRepo::create(&pool, &new_asset("SN-100", "4100"))
        .await
        .unwrap();
    AssetRepo::create(&pool, &new_asset("SN-101", "OLD-TAG"))
        .await
        .unwrap();
    assert_eq!(AssetRepo::next_plate(&pool).await.unwrap(), 4101);
}

// ---------------------------------------------------------------------------
// Test: Assignment lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_assign_and_release(pool: PgPool) {
    let admin = seed_user(&pool, "3001", "Ana", &[roles::ROLE_ADMINISTRATOR]).await;
    let custodian = seed_user(&pool, "3002", "Carlos", &[roles::ROLE_CUSTODIAN]).await;
    let location = seed_location(&pool, "Lab 2").await;
    let asset = AssetRepo::create(&pool, &new_asset("SN-100", "4100"))
        .await
        .unwrap();

    let assignment = AssignmentRepo::assign(
        &pool,
        admin,
        &CreateAssignment {
            asset_id: asset.id,
            custodian_id: custodian,
            location_id: location,
        },
    )
    .await
    .unwrap();
    assert_eq!(assignment.asset_id, asset.id);
    assert!(!assignment.loan_locked);
    assert!(assignment.unassigned_at.is_none());

    let released = AssignmentRepo::unassign(&pool, admin, assignment.id)
        .await
        .unwrap();
    assert!(released.unassigned_at.is_some());

    // Both transitions left audit entries.
    let logs = AuditLogRepo::query(
        &pool,
        &AuditQuery {
            actor_id: Some(admin),
            action_type: None,
            entity_type: Some("custody_assignment".to_string()),
            entity_id: Some(assignment.id),
            limit: None,
            offset: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(logs.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_second_active_assignment_rejected(pool: PgPool) {
    let admin = seed_user(&pool, "3001", "Ana", &[roles::ROLE_ADMINISTRATOR]).await;
    let custodian = seed_user(&pool, "3002", "Carlos", &[roles::ROLE_CUSTODIAN]).await;
    let other = seed_user(&pool, "3003", "Camila", &[roles::ROLE_CUSTODIAN]).await;
    let location = seed_location(&pool, "Lab 2").await;
    let asset = AssetRepo::create(&pool, &new_asset("SN-100", "4100"))
        .await
        .unwrap();

    let first = AssignmentRepo::assign(
        &pool,
        admin,
        &CreateAssignment {
            asset_id: asset.id,
            custodian_id: custodian,
            location_id: location,
        },
    )
    .await
    .unwrap();

    let err = AssignmentRepo::assign(
        &pool,
        admin,
        &CreateAssignment {
            asset_id: asset.id,
            custodian_id: other,
            location_id: location,
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::AlreadyAssigned { asset_id }) if asset_id == asset.id);

    // After release the asset can move to the other custodian.
    AssignmentRepo::unassign(&pool, admin, first.id).await.unwrap();
    let second = AssignmentRepo::assign(
        &pool,
        admin,
        &CreateAssignment {
            asset_id: asset.id,
            custodian_id: other,
            location_id: location,
        },
    )
    .await
    .unwrap();
    assert_eq!(second.custodian_id, other);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unassign_blocked_while_loan_locked(pool: PgPool) {
    let admin = seed_user(&pool, "3001", "Ana", &[roles::ROLE_ADMINISTRATOR]).await;
    let custodian = seed_user(&pool, "3002", "Carlos", &[roles::ROLE_CUSTODIAN]).await;
    let location = seed_location(&pool, "Lab 2").await;
    let asset = AssetRepo::create(&pool, &new_asset("SN-100", "4100"))
        .await
        .unwrap();

    let assignment = AssignmentRepo::assign(
        &pool,
        admin,
        &CreateAssignment {
            asset_id: asset.id,
            custodian_id: custodian,
            location_id: location,
        },
    )
    .await
    .unwrap();
    sqlx::query("UPDATE custody_assignments SET loan_locked = TRUE WHERE id = $1")
        .bind(assignment.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = AssignmentRepo::unassign(&pool, admin, assignment.id)
        .await
        .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::AssetOnLoan { .. }));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unassign_inactive_rejected(pool: PgPool) {
    let admin = seed_user(&pool, "3001", "Ana", &[roles::ROLE_ADMINISTRATOR]).await;
    let custodian = seed_user(&pool, "3002", "Carlos", &[roles::ROLE_CUSTODIAN]).await;
    let location = seed_location(&pool, "Lab 2").await;
    let asset = AssetRepo::create(&pool, &new_asset("SN-100", "4100"))
        .await
        .unwrap();

    let assignment = AssignmentRepo::assign(
        &pool,
        admin,
        &CreateAssignment {
            asset_id: asset.id,
            custodian_id: custodian,
            location_id: location,
        },
    )
    .await
    .unwrap();
    AssignmentRepo::unassign(&pool, admin, assignment.id)
        .await
        .unwrap();

    let err = AssignmentRepo::unassign(&pool, admin, assignment.id)
        .await
        .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Test: Availability views
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_availability_views(pool: PgPool) {
    let admin = seed_user(&pool, "3001", "Ana", &[roles::ROLE_ADMINISTRATOR]).await;
    let custodian = seed_user(&pool, "3002", "Carlos", &[roles::ROLE_CUSTODIAN]).await;
    let location = seed_location(&pool, "Lab 2").await;

    let assigned = AssetRepo::create(&pool, &new_asset("SN-100", "4100"))
        .await
        .unwrap();
    let locked = AssetRepo::create(&pool, &new_asset("SN-101", "4101"))
        .await
        .unwrap();
    let orphan = AssetRepo::create(&pool, &new_asset("SN-102", "4102"))
        .await
        .unwrap();

    AssignmentRepo::assign(
        &pool,
        admin,
        &CreateAssignment {
            asset_id: assigned.id,
            custodian_id: custodian,
            location_id: location,
        },
    )
    .await
    .unwrap();
    let locked_assignment = AssignmentRepo::assign(
        &pool,
        admin,
        &CreateAssignment {
            asset_id: locked.id,
            custodian_id: custodian,
            location_id: location,
        },
    )
    .await
    .unwrap();
    sqlx::query("UPDATE custody_assignments SET loan_locked = TRUE WHERE id = $1")
        .bind(locked_assignment.id)
        .execute(&pool)
        .await
        .unwrap();

    let available = AssetRepo::list_available(&pool).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].asset_id, assigned.id);
    assert_eq!(available[0].custodian_name, "Carlos Test");

    let unassigned = AssetRepo::list_unassigned(&pool).await.unwrap();
    assert_eq!(unassigned.len(), 1);
    assert_eq!(unassigned[0].id, orphan.id);

    let active = AssignmentRepo::list_active(&pool, Some(custodian))
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
}

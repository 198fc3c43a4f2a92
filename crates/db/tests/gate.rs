//! Integration tests for the gate ledger.
//!
//! Exercises exit and re-entry recording against a real database:
//! - Exit requires an approved request and happens at most once
//! - Partial exits demand a stay reason per asset left behind
//! - Physical state is derived from the movement history
//! - Full return closes the loan cycle and releases the loan locks

use assert_matches::assert_matches;
use chrono::NaiveDate;
use sqlx::PgPool;

use sgb_core::error::CoreError;
use sgb_core::gate::PhysicalState;
use sgb_core::roles;
use sgb_core::workflow::SignerRole;
use sgb_db::models::asset::CreateAsset;
use sgb_db::models::assignment::CreateAssignment;
use sgb_db::models::gate::{RecordExit, RecordReentry, StayReason};
use sgb_db::models::location::CreateLocation;
use sgb_db::models::request::CreateRequestBatch;
use sgb_db::models::user::CreateUser;
use sgb_db::repositories::{
    AssetRepo, AssignmentRepo, GateRepo, LocationRepo, RequestRepo, UserRepo,
};
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

struct Fixture {
    requester: i64,
    custodian: i64,
    coordinator: i64,
    admin: i64,
    guard: i64,
    location: i64,
}

async fn seed_people(pool: &PgPool) -> Fixture {
    let requester = seed_user(pool, "2001", "Rita", &[roles::ROLE_REQUESTER]).await;
    let custodian = seed_user(pool, "2002", "Carlos", &[roles::ROLE_CUSTODIAN]).await;
    let coordinator = seed_user(pool, "2003", "Clara", &[roles::ROLE_COORDINATOR]).await;
    let admin = seed_user(pool, "2004", "Ana", &[roles::ROLE_ADMINISTRATOR]).await;
    let guard = seed_user(pool, "2005", "Gustavo", &[roles::ROLE_GUARD]).await;
    let location = LocationRepo::create(
        pool,
        &CreateLocation {
            name: "Main building".to_string(),
            description: None,
        },
    )
    .await
    .unwrap()
    .id;
    Fixture {
        requester,
        custodian,
        coordinator,
        admin,
        guard,
        location,
    }
}

async fn seed_assigned_asset(pool: &PgPool, f: &Fixture, serial: &str, plate: &str) -> i64 {
    let asset = AssetRepo::create(
        pool,
        &CreateAsset {
            serial: serial.to_string(),
            plate: plate.to_string(),
            brand: "Dell".to_string(),
            model: None,
            description: None,
        },
    )
    .await
    .unwrap();
    AssignmentRepo::assign(
        pool,
        f.admin,
        &CreateAssignment {
            asset_id: asset.id,
            custodian_id: f.custodian,
            location_id: f.location,
        },
    )
    .await
    .unwrap()
    .id
}

/// Submit a request for the given assignments and walk it through all three
/// signatures.
async fn approved_request(pool: &PgPool, f: &Fixture, assignment_ids: Vec<i64>) -> i64 {
    let created = RequestRepo::submit_batch(
        pool,
        f.requester,
        &CreateRequestBatch {
            assignment_ids,
            start_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 9, 5).unwrap(),
            destination: "Client site".to_string(),
            reason: "Network installation".to_string(),
        },
    )
    .await
    .unwrap();
    let id = created[0].id;
    RequestRepo::sign(pool, id, SignerRole::Custodian, f.custodian, true, None)
        .await
        .unwrap();
    RequestRepo::sign(pool, id, SignerRole::Coordinator, f.coordinator, true, None)
        .await
        .unwrap();
    RequestRepo::sign(pool, id, SignerRole::Administrator, f.admin, true, None)
        .await
        .unwrap();
    id
}

fn exit_all(assignment_ids: Vec<i64>) -> RecordExit {
    RecordExit {
        assets_leaving: assignment_ids,
        stay_reasons: vec![],
        observations: None,
    }
}

async fn loan_locked(pool: &PgPool, assignment_id: i64) -> bool {
    AssignmentRepo::find_by_id(pool, assignment_id)
        .await
        .unwrap()
        .unwrap()
        .loan_locked
}

// ---------------------------------------------------------------------------
// Test: Exit gating
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_exit_requires_approved_request(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let created = RequestRepo::submit_batch(
        &pool,
        f.requester,
        &CreateRequestBatch {
            assignment_ids: vec![a1],
            start_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 9, 5).unwrap(),
            destination: "Client site".to_string(),
            reason: "Network installation".to_string(),
        },
    )
    .await
    .unwrap();
    let id = created[0].id;

    let err = GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![a1]))
        .await
        .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::RequestNotApproved { .. }));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_exit_happens_at_most_once(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let id = approved_request(&pool, &f, vec![a1]).await;

    GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![a1]))
        .await
        .unwrap();
    let err = GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![a1]))
        .await
        .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::DuplicateGateAction { .. }));
}

// ---------------------------------------------------------------------------
// Test: Partial exit and stay reasons
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_partial_exit_requires_stay_reason(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let a2 = seed_assigned_asset(&pool, &f, "SN-002", "3002").await;
    let id = approved_request(&pool, &f, vec![a1, a2]).await;

    let err = GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![a1]))
        .await
        .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Validation(_)));

    // With the reason supplied the same exit goes through.
    GateRepo::record_exit(
        &pool,
        id,
        f.guard,
        &RecordExit {
            assets_leaving: vec![a1],
            stay_reasons: vec![StayReason {
                assignment_id: a2,
                reason: "Battery swollen, held for inspection".to_string(),
            }],
            observations: None,
        },
    )
    .await
    .unwrap();

    // Only the asset that left is off-site and locked.
    assert_eq!(
        GateRepo::asset_state(&pool, id, a1).await.unwrap(),
        PhysicalState::OffSite
    );
    assert_eq!(
        GateRepo::asset_state(&pool, id, a2).await.unwrap(),
        PhysicalState::OnSite
    );
    assert!(loan_locked(&pool, a1).await);
    assert!(!loan_locked(&pool, a2).await);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stay_reason_for_leaving_asset_rejected(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let a2 = seed_assigned_asset(&pool, &f, "SN-002", "3002").await;
    let id = approved_request(&pool, &f, vec![a1, a2]).await;

    // The reason names the asset that is leaving, not the one staying.
    let err = GateRepo::record_exit(
        &pool,
        id,
        f.guard,
        &RecordExit {
            assets_leaving: vec![a1],
            stay_reasons: vec![StayReason {
                assignment_id: a1,
                reason: "Pending repair".to_string(),
            }],
            observations: None,
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_single_asset_exit_needs_no_reason(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let id = approved_request(&pool, &f, vec![a1]).await;

    GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![a1]))
        .await
        .unwrap();
    assert!(loan_locked(&pool, a1).await);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_exit_rejects_foreign_assignment(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let other = seed_assigned_asset(&pool, &f, "SN-002", "3002").await;
    let id = approved_request(&pool, &f, vec![a1]).await;

    let err = GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![other]))
        .await
        .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Test: Re-entry and cycle close
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_full_return_closes_the_cycle(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let a2 = seed_assigned_asset(&pool, &f, "SN-002", "3002").await;
    let id = approved_request(&pool, &f, vec![a1, a2]).await;

    GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![a1, a2]))
        .await
        .unwrap();

    // First return: one asset back, cycle stays open.
    GateRepo::record_reentry(
        &pool,
        id,
        f.guard,
        &RecordReentry {
            assets_returning: vec![a1],
            observations: None,
        },
    )
    .await
    .unwrap();
    let request = RequestRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert!(request.closed_at.is_none());
    assert!(!loan_locked(&pool, a1).await);
    assert!(loan_locked(&pool, a2).await);
    assert_eq!(
        GateRepo::asset_state(&pool, id, a1).await.unwrap(),
        PhysicalState::OnSite
    );

    // Second return closes the cycle.
    GateRepo::record_reentry(
        &pool,
        id,
        f.guard,
        &RecordReentry {
            assets_returning: vec![a2],
            observations: Some("Returned with scratched lid".to_string()),
        },
    )
    .await
    .unwrap();
    let request = RequestRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert!(request.closed_at.is_some());
    assert!(!loan_locked(&pool, a2).await);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reentry_rejects_asset_that_never_left(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let a2 = seed_assigned_asset(&pool, &f, "SN-002", "3002").await;
    let id = approved_request(&pool, &f, vec![a1, a2]).await;

    GateRepo::record_exit(
        &pool,
        id,
        f.guard,
        &RecordExit {
            assets_leaving: vec![a1],
            stay_reasons: vec![StayReason {
                assignment_id: a2,
                reason: "Pending repair".to_string(),
            }],
            observations: None,
        },
    )
    .await
    .unwrap();

    // The stayed asset was never off-site, so it cannot re-enter.
    let err = GateRepo::record_reentry(
        &pool,
        id,
        f.guard,
        &RecordReentry {
            assets_returning: vec![a2],
            observations: None,
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_double_return_rejected(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let id = approved_request(&pool, &f, vec![a1]).await;

    GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![a1]))
        .await
        .unwrap();
    GateRepo::record_reentry(
        &pool,
        id,
        f.guard,
        &RecordReentry {
            assets_returning: vec![a1],
            observations: None,
        },
    )
    .await
    .unwrap();

    let err = GateRepo::record_reentry(
        &pool,
        id,
        f.guard,
        &RecordReentry {
            assets_returning: vec![a1],
            observations: None,
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, DbError::Core(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Test: Guard views
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_authorizations_list_tracks_exit_and_close(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let id = approved_request(&pool, &f, vec![a1]).await;

    let auths = GateRepo::authorizations(&pool).await.unwrap();
    assert_eq!(auths.len(), 1);
    assert_eq!(auths[0].request_id, id);
    assert!(!auths[0].has_exit);
    assert_eq!(auths[0].asset_count, 1);

    GateRepo::record_exit(&pool, id, f.guard, &exit_all(vec![a1]))
        .await
        .unwrap();
    let auths = GateRepo::authorizations(&pool).await.unwrap();
    assert!(auths[0].has_exit);

    GateRepo::record_reentry(
        &pool,
        id,
        f.guard,
        &RecordReentry {
            assets_returning: vec![a1],
            observations: None,
        },
    )
    .await
    .unwrap();

    // Closed cycles drop off the guard's list.
    let auths = GateRepo::authorizations(&pool).await.unwrap();
    assert!(auths.is_empty());

    let events = GateRepo::list_events(&pool).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].direction, "reentry");
    assert_eq!(events[1].direction, "exit");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_event_detail_lists_per_asset_movements(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let a2 = seed_assigned_asset(&pool, &f, "SN-002", "3002").await;
    let id = approved_request(&pool, &f, vec![a1, a2]).await;

    GateRepo::record_exit(
        &pool,
        id,
        f.guard,
        &RecordExit {
            assets_leaving: vec![a1],
            stay_reasons: vec![StayReason {
                assignment_id: a2,
                reason: "Pending repair".to_string(),
            }],
            observations: None,
        },
    )
    .await
    .unwrap();

    let events = GateRepo::list_events(&pool).await.unwrap();
    let detail = GateRepo::event_detail(&pool, events[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.event.direction, "exit");
    assert_eq!(detail.assets.len(), 2);
    let row_for = |aid: i64| detail.assets.iter().find(|r| r.assignment_id == aid).unwrap();
    assert_eq!(row_for(a1).movement, "exited");
    assert_eq!(row_for(a1).stay_reason, None);
    assert_eq!(row_for(a2).movement, "stayed");
    assert_eq!(row_for(a2).stay_reason.as_deref(), Some("Pending repair"));

    assert!(GateRepo::event_detail(&pool, 9999).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: Derived state feed for the request detail view
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_asset_states_for_request_detail(pool: PgPool) {
    let f = seed_people(&pool).await;
    let a1 = seed_assigned_asset(&pool, &f, "SN-001", "3001").await;
    let a2 = seed_assigned_asset(&pool, &f, "SN-002", "3002").await;
    let id = approved_request(&pool, &f, vec![a1, a2]).await;

    GateRepo::record_exit(
        &pool,
        id,
        f.guard,
        &RecordExit {
            assets_leaving: vec![a2],
            stay_reasons: vec![StayReason {
                assignment_id: a1,
                reason: "In use by another team".to_string(),
            }],
            observations: None,
        },
    )
    .await
    .unwrap();

    let states = GateRepo::asset_states(&pool, id).await.unwrap();
    assert_eq!(states.len(), 2);
    let by_plate = |plate: &str| {
        states
            .iter()
            .find(|s| s.plate == plate)
            .unwrap()
            .physical_state
    };
    assert_eq!(by_plate("3001"), PhysicalState::OnSite);
    assert_eq!(by_plate("3002"), PhysicalState::OffSite);
}

//! Lifecycle tests running the services against the in-memory store

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use oam_server::{
    error::{AppError, RuleViolation},
    models::{
        asset::{Asset, NewAsset, UpdateAsset},
        assignment::{Assignment, NewAssignment, UpdateAssignment},
        category::Category,
        enums::{AssetState, AssignmentStatus, ReturnState, UserStatus},
        location::Location,
        user::{NewUser, User},
    },
    services::Services,
    store::{memory::MemoryStore, ChangeSet, CommitError, Store},
};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn setup() -> (Arc<MemoryStore>, Services) {
    let store = Arc::new(MemoryStore::new());
    store.seed_location(Location {
        id: 1,
        code: "HN".to_string(),
        name: "Ha Noi".to_string(),
    });
    store.seed_location(Location {
        id: 2,
        code: "HCM".to_string(),
        name: "Ho Chi Minh".to_string(),
    });
    store.seed_category(Category {
        id: 1,
        name: "Laptop".to_string(),
        prefix: "LA".to_string(),
    });
    let services = Services::new(store.clone());
    (store, services)
}

fn seed_user(store: &MemoryStore, staff_code: &str, location_id: i32) -> User {
    let user = User::new(
        staff_code.to_string(),
        NewUser {
            first_name: "Binh".to_string(),
            last_name: "Nguyen".to_string(),
            joined_date: today(),
            location_id,
        },
        "admin",
    );
    store.seed_user(user.clone());
    user
}

async fn create_asset(services: &Services) -> Asset {
    services
        .assets
        .create_asset(
            NewAsset {
                name: "ThinkPad T14".to_string(),
                specification: "Core i5, 16GB".to_string(),
                installed_date: today(),
                category_id: 1,
                location_id: 1,
            },
            "admin",
        )
        .await
        .unwrap()
}

async fn create_assignment(services: &Services, user: &User, asset: &Asset) -> Assignment {
    services
        .assignments
        .create_assignment(
            NewAssignment {
                user_id: user.id,
                asset_id: asset.id,
                assigned_date: today(),
                note: None,
            },
            "admin",
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_created_assets_get_sequential_codes() {
    let (store, services) = setup();

    let first = create_asset(&services).await;
    let second = create_asset(&services).await;

    assert_eq!(first.code, "LA000001");
    assert_eq!(second.code, "LA000002");
    assert_eq!(first.state, AssetState::Available);
    assert_eq!(first.version, 0);

    let looked_up = store.get_asset_by_code("LA000002").await.unwrap().unwrap();
    assert_eq!(looked_up.id, second.id);
}

#[tokio::test]
async fn test_staff_code_format() {
    let (_store, services) = setup();

    let code = services.codes.next_staff_code().await.unwrap();
    assert_eq!(code, "SD0001");
}

#[tokio::test]
async fn test_assignment_reserves_asset() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;

    let assignment = create_assignment(&services, &user, &asset).await;
    assert_eq!(assignment.status, AssignmentStatus::WaitingForAcceptance);

    let stored = store.get_asset(asset.id).await.unwrap().unwrap();
    assert_eq!(stored.state, AssetState::Assigned);
    assert_eq!(stored.version, 1);

    // Exactly one live assignment holds the reservation
    let live = store
        .live_assignment_for_asset(asset.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.id, assignment.id);

    // The asset is no longer available for a second assignment
    let other = seed_user(&store, "SD0002", 1);
    let err = services
        .assignments
        .create_assignment(
            NewAssignment {
                user_id: other.id,
                asset_id: asset.id,
                assigned_date: today(),
                note: None,
            },
            "admin",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssetNotAvailable)
    ));

    // The failed attempt left the asset untouched
    let after = store.get_asset(asset.id).await.unwrap().unwrap();
    assert_eq!(after.state, AssetState::Assigned);
    assert_eq!(after.version, 1);
}

#[tokio::test]
async fn test_assigned_asset_cannot_be_edited() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    create_assignment(&services, &user, &asset).await;

    let stored = store.get_asset(asset.id).await.unwrap().unwrap();
    let err = services
        .assets
        .update_asset(
            asset.id,
            UpdateAsset {
                name: "Renamed".to_string(),
                specification: stored.specification.clone(),
                installed_date: stored.installed_date,
                state: AssetState::Assigned,
                version: stored.version,
            },
            "admin",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssetNotEditable)
    ));
}

#[tokio::test]
async fn test_asset_state_transitions_are_guarded() {
    let (_store, services) = setup();
    let asset = create_asset(&services).await;

    let request = |state, version| UpdateAsset {
        name: asset.name.clone(),
        specification: asset.specification.clone(),
        installed_date: asset.installed_date,
        state,
        version,
    };

    // Recycling must go through WAITING_FOR_RECYCLING
    let err = services
        .assets
        .update_asset(asset.id, request(AssetState::Recycled, 0), "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssetStateInvalid)
    ));

    // ASSIGNED is never entered through an edit
    let err = services
        .assets
        .update_asset(asset.id, request(AssetState::Assigned, 0), "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssetStateInvalid)
    ));

    let updated = services
        .assets
        .update_asset(asset.id, request(AssetState::WaitingForRecycling, 0), "admin")
        .await
        .unwrap();
    assert_eq!(updated.version, 1);

    let recycled = services
        .assets
        .update_asset(asset.id, request(AssetState::Recycled, 1), "admin")
        .await
        .unwrap();
    assert_eq!(recycled.state, AssetState::Recycled);
}

#[tokio::test]
async fn test_delete_asset_blocked_by_assignment_history() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    // Even a declined assignment pins the asset
    services
        .assignments
        .update_status(assignment.id, AssignmentStatus::Declined, 0, "admin")
        .await
        .unwrap();

    let stored = store.get_asset(asset.id).await.unwrap().unwrap();
    let err = services
        .assets
        .delete_asset(asset.id, stored.version)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssetNotDeletable)
    ));

    // A fresh asset deletes fine
    let fresh = create_asset(&services).await;
    services.assets.delete_asset(fresh.id, 0).await.unwrap();
    assert!(store.get_asset(fresh.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_decline_releases_asset() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    let declined = services
        .assignments
        .update_status(assignment.id, AssignmentStatus::Declined, 0, "admin")
        .await
        .unwrap();
    assert_eq!(declined.status, AssignmentStatus::Declined);

    let stored = store.get_asset(asset.id).await.unwrap().unwrap();
    assert_eq!(stored.state, AssetState::Available);
    assert!(store
        .live_assignment_for_asset(asset.id)
        .await
        .unwrap()
        .is_none());

    // A declined assignment is final
    let err = services
        .assignments
        .update_status(declined.id, AssignmentStatus::Accepted, declined.version, "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssignmentStatusNotUpdatable)
    ));
}

#[tokio::test]
async fn test_completed_is_not_reachable_by_status_update() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    let err = services
        .assignments
        .update_status(assignment.id, AssignmentStatus::Completed, 0, "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssignmentStatusNotUpdatable)
    ));
}

#[tokio::test]
async fn test_delete_waiting_assignment_releases_asset() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    services
        .assignments
        .delete_assignment(assignment.id, 0, "admin")
        .await
        .unwrap();

    let stored = store.get_asset(asset.id).await.unwrap().unwrap();
    assert_eq!(stored.state, AssetState::Available);
    assert!(store.get_assignment(assignment.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_accepted_assignment_cannot_be_deleted_or_edited() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    let accepted = services
        .assignments
        .update_status(assignment.id, AssignmentStatus::Accepted, 0, "admin")
        .await
        .unwrap();

    let err = services
        .assignments
        .delete_assignment(accepted.id, accepted.version, "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssignmentNotDeletable)
    ));

    let err = services
        .assignments
        .update_assignment(
            accepted.id,
            UpdateAssignment {
                user_id: user.id,
                asset_id: asset.id,
                assigned_date: today(),
                note: Some("note".to_string()),
                version: accepted.version,
            },
            "admin",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssignmentNotUpdatable)
    ));
}

#[tokio::test]
async fn test_assignment_edit_swaps_asset_atomically() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let first = create_asset(&services).await;
    let second = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &first).await;

    let updated = services
        .assignments
        .update_assignment(
            assignment.id,
            UpdateAssignment {
                user_id: user.id,
                asset_id: second.id,
                assigned_date: today(),
                note: None,
                version: 0,
            },
            "admin",
        )
        .await
        .unwrap();
    assert_eq!(updated.asset_id, second.id);
    assert_eq!(updated.version, 1);

    let old = store.get_asset(first.id).await.unwrap().unwrap();
    let new = store.get_asset(second.id).await.unwrap().unwrap();
    assert_eq!(old.state, AssetState::Available);
    assert_eq!(new.state, AssetState::Assigned);
}

#[tokio::test]
async fn test_swap_to_unavailable_asset_fails_whole_update() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let first = create_asset(&services).await;
    let second = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &first).await;

    services
        .assets
        .update_asset(
            second.id,
            UpdateAsset {
                name: second.name.clone(),
                specification: second.specification.clone(),
                installed_date: second.installed_date,
                state: AssetState::NotAvailable,
                version: 0,
            },
            "admin",
        )
        .await
        .unwrap();

    let err = services
        .assignments
        .update_assignment(
            assignment.id,
            UpdateAssignment {
                user_id: user.id,
                asset_id: second.id,
                assigned_date: today(),
                note: None,
                version: 0,
            },
            "admin",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssetNotAvailable)
    ));

    // The failed swap left every row exactly as it was
    let old = store.get_asset(first.id).await.unwrap().unwrap();
    assert_eq!(old.state, AssetState::Assigned);
    assert_eq!(old.version, 1);
    let new = store.get_asset(second.id).await.unwrap().unwrap();
    assert_eq!(new.state, AssetState::NotAvailable);
    assert_eq!(new.version, 1);
    let stored = store.get_assignment(assignment.id).await.unwrap().unwrap();
    assert_eq!(stored.asset_id, first.id);
    assert_eq!(stored.version, 0);
}

#[tokio::test]
async fn test_assigned_date_cannot_move_into_past() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    let err = services
        .assignments
        .update_assignment(
            assignment.id,
            UpdateAssignment {
                user_id: user.id,
                asset_id: asset.id,
                assigned_date: today().pred_opt().unwrap(),
                note: None,
                version: 0,
            },
            "admin",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Keeping the original date is fine
    let updated = services
        .assignments
        .update_assignment(
            assignment.id,
            UpdateAssignment {
                user_id: user.id,
                asset_id: asset.id,
                assigned_date: assignment.assigned_date,
                note: Some("unchanged date".to_string()),
                version: 0,
            },
            "admin",
        )
        .await
        .unwrap();
    assert_eq!(updated.version, 1);
}

#[tokio::test]
async fn test_location_mismatch_rejected() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 2);
    let asset = create_asset(&services).await; // location 1

    let err = services
        .assignments
        .create_assignment(
            NewAssignment {
                user_id: user.id,
                asset_id: asset.id,
                assigned_date: today(),
                note: None,
            },
            "admin",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_return_flow_completes_assignment_and_releases_asset() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;
    services
        .assignments
        .update_status(assignment.id, AssignmentStatus::Accepted, 0, "admin")
        .await
        .unwrap();

    let request = services
        .asset_returns
        .create_return(assignment.id, "admin")
        .await
        .unwrap();
    assert_eq!(request.state, ReturnState::WaitingForReturning);
    assert!(request.returned_date.is_none());

    // Only one active request per assignment
    let err = services
        .asset_returns
        .create_return(assignment.id, "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::ReturnAlreadyRequested)
    ));

    let completed = services
        .asset_returns
        .update_return(request.id, ReturnState::Completed, 0, "admin")
        .await
        .unwrap();
    assert_eq!(completed.state, ReturnState::Completed);
    assert_eq!(completed.returned_date, Some(today()));

    let stored_assignment = store.get_assignment(assignment.id).await.unwrap().unwrap();
    assert_eq!(stored_assignment.status, AssignmentStatus::Completed);
    let stored_asset = store.get_asset(asset.id).await.unwrap().unwrap();
    assert_eq!(stored_asset.state, AssetState::Available);
}

#[tokio::test]
async fn test_canceled_return_allows_a_new_request() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;
    services
        .assignments
        .update_status(assignment.id, AssignmentStatus::Accepted, 0, "admin")
        .await
        .unwrap();

    let request = services
        .asset_returns
        .create_return(assignment.id, "admin")
        .await
        .unwrap();
    let canceled = services
        .asset_returns
        .update_return(request.id, ReturnState::Canceled, 0, "admin")
        .await
        .unwrap();
    assert_eq!(canceled.state, ReturnState::Canceled);

    // The assignment and asset are untouched by a cancellation
    let stored = store.get_assignment(assignment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::Accepted);

    services
        .asset_returns
        .create_return(assignment.id, "admin")
        .await
        .unwrap();

    // Terminal return states cannot move again
    let err = services
        .asset_returns
        .update_return(canceled.id, ReturnState::Completed, canceled.version, "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::ReturnNotUpdatable)
    ));
}

#[tokio::test]
async fn test_return_requires_accepted_assignment() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    let err = services
        .asset_returns
        .create_return(assignment.id, "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::AssignmentNotAccepted)
    ));
}

#[tokio::test]
async fn test_deactivation_blocked_by_live_assignments() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    let err = services
        .users
        .update_user_status(user.id, UserStatus::Inactive, 0, "admin")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Rule(RuleViolation::UserHasActiveAssignments)
    ));

    // A declined assignment no longer counts
    services
        .assignments
        .update_status(assignment.id, AssignmentStatus::Declined, 0, "admin")
        .await
        .unwrap();
    let deactivated = services
        .users
        .update_user_status(user.id, UserStatus::Inactive, 0, "admin")
        .await
        .unwrap();
    assert_eq!(deactivated.status, UserStatus::Inactive);
}

#[tokio::test]
async fn test_stale_version_is_a_conflict() {
    let (_store, services) = setup();
    let asset = create_asset(&services).await;

    let request = UpdateAsset {
        name: "Renamed".to_string(),
        specification: asset.specification.clone(),
        installed_date: asset.installed_date,
        state: AssetState::Available,
        version: 0,
    };

    services
        .assets
        .update_asset(asset.id, request.clone(), "admin")
        .await
        .unwrap();

    // Replaying the same request with the stale version is rejected
    let err = services
        .assets
        .update_asset(asset.id, request, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_commits_one_wins() {
    let (store, services) = setup();
    let asset = create_asset(&services).await;

    // Both writers hold the same snapshot; the store lets exactly one through
    let mut tasks = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let mut copy = asset.clone();
        tasks.push(tokio::spawn(async move {
            copy.touch("writer");
            store.commit(ChangeSet::new().update_asset(copy)).await
        }));
    }

    let mut ok = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => ok += 1,
            Err(CommitError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected commit error: {e}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 1);

    let stored = store.get_asset(asset.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_code_allocation_is_gap_free() {
    let (_store, services) = setup();

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let codes = services.codes.clone();
        tasks.push(tokio::spawn(
            async move { codes.next_asset_code("LA").await },
        ));
    }

    let mut seen = Vec::new();
    for task in tasks {
        seen.push(task.await.unwrap().unwrap());
    }
    seen.sort();

    let expected: Vec<String> = (1..=50).map(|n| format!("LA{n:06}")).collect();
    assert_eq!(seen, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_assignment_edits_one_wins() {
    let (store, services) = setup();
    let user = seed_user(&store, "SD0001", 1);
    let asset = create_asset(&services).await;
    let assignment = create_assignment(&services, &user, &asset).await;

    let mut tasks = Vec::new();
    for note in ["first editor", "second editor"] {
        let assignments = services.assignments.clone();
        let request = UpdateAssignment {
            user_id: user.id,
            asset_id: asset.id,
            assigned_date: today(),
            note: Some(note.to_string()),
            version: 0,
        };
        let id = assignment.id;
        tasks.push(tokio::spawn(async move {
            assignments.update_assignment(id, request, "admin").await
        }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(updated) => winners.push(updated),
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);

    let stored = store.get_assignment(assignment.id).await.unwrap().unwrap();
    assert_eq!(stored.note, winners[0].note);
    assert_eq!(stored.version, 1);
}

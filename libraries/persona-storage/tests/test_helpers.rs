//! Repository contract checks shared by every backend's integration tests
//!
//! Each check takes a repository that is already connected and works on
//! records it creates itself, so checks can share one store.

#![allow(dead_code)]

use persona_core::{CreateUser, PasswordUpdate, User, UserError, UserId, UserRepository};
use std::sync::Arc;

/// Test fixture: the reference user
pub fn alice() -> CreateUser {
    CreateUser {
        username: "alice".to_string(),
        name: "Alice".to_string(),
        surname: "A".to_string(),
        age: 30,
        password: "p1".to_string(),
    }
}

/// Test fixture: a user with a distinct username
pub fn user_named(username: &str) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        name: username.to_uppercase(),
        surname: "Test".to_string(),
        age: 42,
        password: format!("{username}-secret"),
    }
}

/// An id of the right shape for `repo` that no record will ever have
pub fn missing_id(repo: &dyn UserRepository) -> UserId {
    match repo.backend() {
        "mongodb" => UserId::Opaque("0123456789abcdef01234567".to_string()),
        _ => UserId::Numeric(i64::MAX - 7),
    }
}

pub async fn check_create_then_get_returns_equal_user(repo: &dyn UserRepository) {
    let created = repo
        .create(user_named("round-trip"))
        .await
        .expect("Failed to create user");
    let fetched = repo
        .get_by_id(&created.id)
        .await
        .expect("Failed to get user");

    assert_eq!(fetched, created);
    assert_eq!(created.username, "round-trip");
    assert_eq!(created.age, 42);
}

pub async fn check_unknown_id_is_not_found(repo: &dyn UserRepository) {
    let id = missing_id(repo);
    let err = repo.get_by_id(&id).await.unwrap_err();
    assert!(
        matches!(&err, UserError::UserNotFound(reported) if *reported == id),
        "unexpected {err:?}"
    );

    // Ids of the wrong shape for the backend are just as absent
    let err = repo
        .get_by_id(&UserId::Opaque("not-an-id".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::UserNotFound(_)), "unexpected {err:?}");
}

pub async fn check_update_password_moves_updated_at_forward(repo: &dyn UserRepository) {
    let created = repo
        .create(user_named("rotate"))
        .await
        .expect("Failed to create user");

    let updated = repo
        .update_password(PasswordUpdate {
            id: created.id.clone(),
            password: created.password.clone(),
            new_password: "fresh".to_string(),
        })
        .await
        .expect("Failed to update password");
    assert_eq!(updated.id, created.id);

    let after_first = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(after_first.password, "fresh");
    assert!(after_first.updated_at > created.updated_at);
    assert_eq!(after_first.created_at, created.created_at);

    // An immediate second update still moves strictly forward
    repo.update_password(PasswordUpdate {
        id: created.id.clone(),
        password: "fresh".to_string(),
        new_password: "fresher".to_string(),
    })
    .await
    .expect("Failed to update password twice");

    let after_second = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(after_second.password, "fresher");
    assert!(after_second.updated_at > after_first.updated_at);
}

pub async fn check_wrong_password_is_mismatch(repo: &dyn UserRepository) {
    let created = repo
        .create(user_named("guarded"))
        .await
        .expect("Failed to create user");

    let err = repo
        .update_password(PasswordUpdate {
            id: created.id.clone(),
            password: "not-the-password".to_string(),
            new_password: "hijacked".to_string(),
        })
        .await
        .unwrap_err();
    assert!(
        matches!(&err, UserError::PasswordMismatch(id) if *id == created.id),
        "unexpected {err:?}"
    );

    let unchanged = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(unchanged, created);
}

pub async fn check_update_unknown_id_is_not_found(repo: &dyn UserRepository) {
    let err = repo
        .update_password(PasswordUpdate {
            id: missing_id(repo),
            password: "p1".to_string(),
            new_password: "p2".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::UserNotFound(_)), "unexpected {err:?}");
}

/// Create alice, change `p1` to `p2`, read back
pub async fn check_alice_scenario(repo: &dyn UserRepository) -> User {
    let created = repo.create(alice()).await.expect("Failed to create alice");
    assert_eq!(created.username, "alice");
    assert_eq!(created.name, "Alice");
    assert_eq!(created.surname, "A");
    assert_eq!(created.age, 30);
    assert_eq!(created.password, "p1");
    assert_eq!(created.created_at, created.updated_at);

    let updated = repo
        .update_password(PasswordUpdate {
            id: created.id.clone(),
            password: "p1".to_string(),
            new_password: "p2".to_string(),
        })
        .await
        .expect("Failed to update alice's password");
    assert_eq!(updated.id, created.id);

    let fetched = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(fetched.password, "p2");
    assert!(fetched.updated_at > fetched.created_at);
    fetched
}

/// Several callers race to replace the same password; exactly one wins
///
/// Only meaningful for backends that serialize the check and the write.
pub async fn check_racing_updates_have_one_winner(repo: Arc<dyn UserRepository>) {
    let created = repo
        .create(user_named("contended"))
        .await
        .expect("Failed to create user");

    let mut handles = Vec::new();
    for n in 0..8 {
        let repo = Arc::clone(&repo);
        let id = created.id.clone();
        let current = created.password.clone();
        handles.push(tokio::spawn(async move {
            repo.update_password(PasswordUpdate {
                id,
                password: current,
                new_password: format!("winner-{n}"),
            })
            .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.expect("update task panicked") {
            Ok(_) => winners += 1,
            Err(UserError::PasswordMismatch(_)) => {}
            Err(other) => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(winners, 1);

    let stored = repo.get_by_id(&created.id).await.unwrap();
    assert!(stored.password.starts_with("winner-"));
}

/// Every single-caller check, in order
pub async fn run_contract(repo: &dyn UserRepository) {
    check_create_then_get_returns_equal_user(repo).await;
    check_unknown_id_is_not_found(repo).await;
    check_update_password_moves_updated_at_forward(repo).await;
    check_wrong_password_is_mismatch(repo).await;
    check_update_unknown_id_is_not_found(repo).await;
    check_alice_scenario(repo).await;
}

//! Repository contract against the in-memory backend
//!
//! Runs without any external service, so these always run.

mod test_helpers;

use persona_core::UserRepository;
use persona_storage::InMemoryUserRepository;
use std::sync::Arc;
use test_helpers::*;

#[tokio::test]
async fn test_create_then_get_returns_equal_user() {
    check_create_then_get_returns_equal_user(&InMemoryUserRepository::new()).await;
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    check_unknown_id_is_not_found(&InMemoryUserRepository::new()).await;
}

#[tokio::test]
async fn test_update_password_moves_updated_at_forward() {
    check_update_password_moves_updated_at_forward(&InMemoryUserRepository::new()).await;
}

#[tokio::test]
async fn test_wrong_password_is_mismatch() {
    check_wrong_password_is_mismatch(&InMemoryUserRepository::new()).await;
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    check_update_unknown_id_is_not_found(&InMemoryUserRepository::new()).await;
}

#[tokio::test]
async fn test_alice_scenario() {
    let repo = InMemoryUserRepository::new();
    let alice = check_alice_scenario(&repo).await;
    assert_eq!(repo.backend(), "memory");
    assert_eq!(alice.id, persona_core::UserId::Numeric(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_updates_have_one_winner() {
    check_racing_updates_have_one_winner(Arc::new(InMemoryUserRepository::new())).await;
}

#[tokio::test]
async fn test_full_contract_on_one_store() {
    let repo = InMemoryUserRepository::new();
    run_contract(&repo).await;
    assert_eq!(repo.len().await, 4);
}

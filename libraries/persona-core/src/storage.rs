//! Repository contract shared by every backend

use crate::error::Result;
use crate::types::{CreateUser, PasswordUpdate, PasswordUpdated, User, UserId};
use async_trait::async_trait;

/// Uniform access to user records
///
/// One implementation exists per storage engine. Callers depend on this trait
/// only; the concrete variant is picked once by the composition root.
/// Implementations hold an injected connection handle and no cached state, so
/// every call goes to the backend.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Short backend label used in logs and health output
    fn backend(&self) -> &'static str;

    /// Get user by ID
    ///
    /// Fails with `UserNotFound` when no record exists.
    async fn get_by_id(&self, id: &UserId) -> Result<User>;

    /// Create a new user
    ///
    /// The backend assigns the id and both timestamps. The returned value is
    /// exactly what a later `get_by_id` yields.
    async fn create(&self, user: CreateUser) -> Result<User>;

    /// Replace the password after checking the current one
    ///
    /// Fails with `UserNotFound` or `PasswordMismatch`; on success bumps
    /// `updated_at` and returns the id only.
    async fn update_password(&self, update: PasswordUpdate) -> Result<PasswordUpdated>;
}

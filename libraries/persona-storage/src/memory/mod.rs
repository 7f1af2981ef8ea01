//! In-process adapter
//!
//! Keeps users in a map behind an async lock. Used for local runs without a
//! database and as the reference implementation the contract tests exercise.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use persona_core::{
    CreateUser, PasswordUpdate, PasswordUpdated, Result, User, UserError, UserId, UserRepository,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// User repository held in memory; ids start at 1
#[derive(Debug)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<i64, User>>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_by_id(&self, id: &UserId) -> Result<User> {
        let users = self.users.read().await;
        id.as_i64()
            .and_then(|key| users.get(&key))
            .cloned()
            .ok_or_else(|| UserError::UserNotFound(id.clone()))
    }

    async fn create(&self, user: CreateUser) -> Result<User> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let created = User {
            id: UserId::Numeric(id),
            username: user.username,
            name: user.name,
            surname: user.surname,
            password: user.password,
            age: user.age,
            created_at: now,
            updated_at: now,
        };

        self.users.write().await.insert(id, created.clone());
        tracing::debug!(backend = "memory", user_id = id, "Created user");
        Ok(created)
    }

    async fn update_password(&self, update: PasswordUpdate) -> Result<PasswordUpdated> {
        let mut users = self.users.write().await;
        let Some(stored) = update.id.as_i64().and_then(|key| users.get_mut(&key)) else {
            return Err(UserError::UserNotFound(update.id));
        };
        if stored.password != update.password {
            return Err(UserError::PasswordMismatch(update.id));
        }

        stored.password = update.new_password;
        stored.updated_at = Utc::now().max(stored.updated_at + Duration::nanoseconds(1));

        Ok(PasswordUpdated {
            id: stored.id.clone(),
        })
    }
}

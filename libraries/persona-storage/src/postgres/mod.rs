//! Single-node PostgreSQL adapter
//!
//! Reads and creates are single statements. Password updates run in an sqlx
//! transaction that is rolled back on any error; there is no retry because a
//! single node does not raise the serialization conflicts CockroachDB does.

pub(crate) mod queries;

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::Utc;
use persona_core::{
    CreateUser, PasswordUpdate, PasswordUpdated, Result, User, UserError, UserId, UserRepository,
};
use sqlx::PgPool;

/// User repository backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn get_by_id(&self, id: &UserId) -> Result<User> {
        let Some(key) = id.as_i64() else {
            return Err(UserError::UserNotFound(id.clone()));
        };

        queries::find_by_id(&self.pool, key)
            .await?
            .ok_or_else(|| UserError::UserNotFound(id.clone()))
    }

    async fn create(&self, user: CreateUser) -> Result<User> {
        let created = queries::insert(&self.pool, &user, Utc::now()).await?;
        tracing::debug!(backend = "postgres", user_id = %created.id, "Created user");
        Ok(created)
    }

    async fn update_password(&self, update: PasswordUpdate) -> Result<PasswordUpdated> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        match queries::update_password(&mut tx, &update).await {
            Ok(updated) => {
                tx.commit().await.map_err(StorageError::from)?;
                tracing::debug!(backend = "postgres", user_id = %updated.id, "Updated password");
                Ok(updated)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err.into())
            }
        }
    }
}

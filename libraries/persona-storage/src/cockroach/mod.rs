//! CockroachDB adapter
//!
//! Speaks the PostgreSQL wire protocol, so it reuses the relational queries.
//! Every write goes through the [`RetryingExecutor`] because CockroachDB runs
//! at SERIALIZABLE isolation and aborts conflicting transactions with `40001`.

use crate::error::{Result as StorageResult, StorageError};
use crate::postgres::queries;
use crate::retry::{RetryPolicy, RetryingExecutor, Sleeper, TokioSleeper};
use crate::schema;
use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::BoxFuture;
use persona_core::{
    CreateUser, PasswordUpdate, PasswordUpdated, Result, User, UserError, UserId, UserRepository,
};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

/// User repository backed by CockroachDB
#[derive(Debug, Clone)]
pub struct CockroachUserRepository<S = TokioSleeper> {
    pool: PgPool,
    executor: RetryingExecutor<S>,
}

impl CockroachUserRepository<TokioSleeper> {
    pub fn new(pool: PgPool, policy: RetryPolicy) -> Self {
        Self::with_executor(pool, RetryingExecutor::new(policy))
    }

    /// Create the `users` table if needed, then build the repository
    pub async fn initialize(pool: PgPool, policy: RetryPolicy) -> StorageResult<Self> {
        schema::ensure_users_table(&pool).await?;
        Ok(Self::new(pool, policy))
    }
}

impl<S: Sleeper> CockroachUserRepository<S> {
    pub fn with_executor(pool: PgPool, executor: RetryingExecutor<S>) -> Self {
        Self { pool, executor }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `work` in a retried transaction on one pooled connection
    ///
    /// The connection is held for the whole call, every attempt included.
    async fn in_transaction<T, F>(&self, work: F) -> StorageResult<T>
    where
        T: Send,
        F: for<'c> FnMut(&'c mut PoolConnection<Postgres>) -> BoxFuture<'c, StorageResult<T>>
            + Send,
    {
        let mut conn = self.pool.acquire().await.map_err(StorageError::from)?;
        self.executor.execute(&mut conn, work).await
    }
}

#[async_trait]
impl<S: Sleeper + 'static> UserRepository for CockroachUserRepository<S> {
    fn backend(&self) -> &'static str {
        "cockroach"
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
        let created = self
            .in_transaction(|conn| {
                let user = user.clone();
                Box::pin(async move { queries::insert(&mut **conn, &user, Utc::now()).await })
            })
            .await?;

        tracing::debug!(backend = "cockroach", user_id = %created.id, "Created user");
        Ok(created)
    }

    async fn update_password(&self, update: PasswordUpdate) -> Result<PasswordUpdated> {
        let updated = self
            .in_transaction(|conn| {
                let update = update.clone();
                Box::pin(async move { queries::update_password(&mut **conn, &update).await })
            })
            .await?;

        tracing::debug!(backend = "cockroach", user_id = %updated.id, "Updated password");
        Ok(updated)
    }
}

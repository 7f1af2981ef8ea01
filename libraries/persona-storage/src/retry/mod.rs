//! Retrying transaction executor
//!
//! Distributed SQL backends running at SERIALIZABLE isolation abort one of two
//! overlapping transactions with SQLSTATE `40001`. The aborted transaction is
//! safe to run again from the start, so the executor wraps a unit of work in
//! BEGIN/COMMIT, rolls back on that specific conflict, waits and tries again.
//!
//! One logical call moves through
//! `Idle -> TxBegun -> UnitOfWork -> {Done | Rollback -> Backoff -> TxBegun | Rollback -> Failed}`
//! and ends in `Done`, `Failed` or `MaxRetriesExceeded`.
//!
//! The backoff wait goes through a [`Sleeper`] so tests can observe it without
//! spending wall-clock time.

use crate::error::{Result, StorageError};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use sqlx::pool::PoolConnection;
use sqlx::{Executor, Postgres};
use std::time::Duration;

/// Attempts allowed before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base of the exponential backoff
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Bounds and timing of the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never zero.
    pub max_attempts: u32,
    /// Wait after a conflict on attempt `n` is `base_delay * 2^n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Deterministic exponential backoff, no jitter
    ///
    /// `attempt` is 1-based: a conflict on the first attempt waits
    /// `2 * base_delay`, the second `4 * base_delay` and so on.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Non-blocking wait used between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A connection that can run explicit transactions
///
/// The executor holds one of these for the whole call; the unit of work gets
/// a mutable borrow of it while a transaction is open.
#[async_trait]
pub trait TransactionalConnection: Send {
    async fn begin(&mut self) -> Result<()>;
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;
}

#[async_trait]
impl TransactionalConnection for PoolConnection<Postgres> {
    async fn begin(&mut self) -> Result<()> {
        (&mut **self).execute("BEGIN").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        (&mut **self).execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        (&mut **self).execute("ROLLBACK").await?;
        Ok(())
    }
}

/// Result of a single attempt
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// Unit of work and COMMIT both succeeded
    Committed(T),
    /// Unit of work or COMMIT reported a serialization conflict
    RetryableConflict(StorageError),
    /// Anything else; ends the call
    Fatal(StorageError),
}

/// Runs units of work under [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryingExecutor<S = TokioSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl RetryingExecutor<TokioSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleeper: TokioSleeper,
        }
    }
}

impl Default for RetryingExecutor<TokioSleeper> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<S: Sleeper> RetryingExecutor<S> {
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute `work` inside a transaction on `conn`, retrying on conflicts
    ///
    /// `work` runs from the start on every attempt, so every statement it
    /// issues must be safe to repeat until COMMIT succeeds. Non-retryable
    /// errors (including domain errors) are returned unchanged after a single
    /// rollback.
    pub async fn execute<C, T, F>(&self, conn: &mut C, mut work: F) -> Result<T>
    where
        C: TransactionalConnection,
        T: Send,
        F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T>> + Send,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let conflict = match self.attempt(conn, &mut work).await {
                AttemptOutcome::Committed(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Transaction committed after retry");
                    }
                    return Ok(value);
                }
                AttemptOutcome::Fatal(err) => {
                    if let Err(rollback_err) = conn.rollback().await {
                        tracing::warn!(error = %rollback_err, "Rollback after failed transaction failed");
                    }
                    return Err(err);
                }
                AttemptOutcome::RetryableConflict(err) => err,
            };

            if let Err(rollback_err) = conn.rollback().await {
                return Err(StorageError::RestartFailed {
                    rollback: Box::new(rollback_err),
                    conflict: Box::new(conflict),
                });
            }

            if attempt >= self.policy.max_attempts {
                tracing::error!(
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    error = %conflict,
                    "Transaction retries exhausted"
                );
                return Err(StorageError::MaxRetriesExceeded {
                    attempts: attempt,
                    last: Box::new(conflict),
                });
            }

            let delay = self.policy.delay_for_attempt(attempt);
            tracing::warn!(
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %conflict,
                "Transaction conflict, retrying"
            );
            self.sleeper.sleep(delay).await;
        }
    }

    async fn attempt<C, T, F>(&self, conn: &mut C, work: &mut F) -> AttemptOutcome<T>
    where
        C: TransactionalConnection,
        T: Send,
        F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T>> + Send,
    {
        if let Err(err) = conn.begin().await {
            return classify(err);
        }

        let value = match work(&mut *conn).await {
            Ok(value) => value,
            Err(err) => return classify(err),
        };

        match conn.commit().await {
            Ok(()) => AttemptOutcome::Committed(value),
            Err(err) if err.is_retryable_conflict() => AttemptOutcome::RetryableConflict(err),
            Err(err) => AttemptOutcome::Fatal(StorageError::AmbiguousCommit(Box::new(err))),
        }
    }
}

fn classify<T>(err: StorageError) -> AttemptOutcome<T> {
    if err.is_retryable_conflict() {
        AttemptOutcome::RetryableConflict(err)
    } else {
        AttemptOutcome::Fatal(err)
    }
}

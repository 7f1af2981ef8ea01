//! Relational schema bootstrap

use crate::error::{Result, StorageError};
use sqlx::PgPool;

// Embedded migrations, idempotent so they can run on every startup
const MIGRATIONS: &[&str] = &[include_str!(
    "../migrations/20240101000001_create_users.sql"
)];

/// Create the `users` table if it does not exist yet
///
/// Required for CockroachDB, where the repository owns schema creation.
/// PostgreSQL deployments may call it too.
pub async fn ensure_users_table(pool: &PgPool) -> Result<()> {
    for migration in MIGRATIONS {
        sqlx::query(migration)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
    }

    tracing::debug!("users table ready");
    Ok(())
}

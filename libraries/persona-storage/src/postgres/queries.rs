//! SQL shared by the PostgreSQL and CockroachDB adapters
//!
//! Every function takes any Postgres executor, so the same statement runs on
//! a pool, inside an sqlx transaction or on a connection owned by the retry
//! executor.

use crate::error::Result;
use chrono::{DateTime, Utc};
use persona_core::{CreateUser, PasswordUpdate, PasswordUpdated, User, UserError, UserId};
use sqlx::{Executor, PgConnection, Postgres};

/// Row shape of the `users` table
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: i64,
    username: String,
    name: String,
    surname: String,
    password: String,
    age: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::Numeric(row.id),
            username: row.username,
            name: row.name,
            surname: row.surname,
            password: row.password,
            age: row.age,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, name, surname, password, age, created_at, updated_at
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(User::from))
}

/// Insert a user; both timestamps get `now`
///
/// `RETURNING` hands back the stored row, so timestamps come back at the
/// column's precision rather than the caller's.
pub(crate) async fn insert<'e, E>(executor: E, user: &CreateUser, now: DateTime<Utc>) -> Result<User>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (username, name, surname, password, age, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         RETURNING id, username, name, surname, password, age, created_at, updated_at",
    )
    .bind(&user.username)
    .bind(&user.name)
    .bind(&user.surname)
    .bind(&user.password)
    .bind(user.age)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

/// Check-then-set password update; must run inside a transaction
///
/// The row is locked by `FOR UPDATE`. `updated_at` always moves strictly
/// forward, even when the clock reads the same microsecond as the last write.
pub(crate) async fn update_password(
    conn: &mut PgConnection,
    update: &PasswordUpdate,
) -> Result<PasswordUpdated> {
    let Some(id) = update.id.as_i64() else {
        return Err(UserError::UserNotFound(update.id.clone()).into());
    };

    let stored: Option<String> =
        sqlx::query_scalar("SELECT password FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(stored) = stored else {
        return Err(UserError::UserNotFound(update.id.clone()).into());
    };
    if stored != update.password {
        return Err(UserError::PasswordMismatch(update.id.clone()).into());
    }

    sqlx::query(
        "UPDATE users
         SET password = $2,
             updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond')
         WHERE id = $1",
    )
    .bind(id)
    .bind(&update.new_password)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(PasswordUpdated {
        id: UserId::Numeric(id),
    })
}

//! Neo4j adapter
//!
//! Users are `:User` nodes addressed by their internal node id. Each
//! operation is a single Cypher statement, which Neo4j runs in its own
//! auto-commit transaction.
//!
//! Timestamps travel as RFC 3339 strings: written through `datetime($x)` and
//! read back through `toString(..)`.

use crate::error::{Result as StorageResult, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use neo4rs::{query, Graph, Query, Row};
use persona_core::{
    CreateUser, PasswordUpdate, PasswordUpdated, Result, User, UserError, UserId, UserRepository,
};

const RETURN_USER: &str = "RETURN id(user) AS id, user.username AS username, user.name AS name,
       user.surname AS surname, user.password AS password, user.age AS age,
       toString(user.createdAt) AS createdAt, toString(user.updatedAt) AS updatedAt";

const CREATE_USER: &str = "CREATE (user:User {
         username: $username, name: $name, surname: $surname,
         password: $password, age: $age,
         createdAt: datetime($now), updatedAt: datetime($now)
       })";

const MATCH_USER: &str = "MATCH (user:User) WHERE id(user) = $id";

// One row with `matched` when the node exists, no row otherwise.
// `updatedAt` only moves when the password matched, and always forward.
const UPDATE_PASSWORD: &str = "MATCH (user:User) WHERE id(user) = $id
       WITH user, user.password = $password AS matched
       SET user.password = CASE WHEN matched THEN $newPassword ELSE user.password END,
           user.updatedAt = CASE
             WHEN NOT matched THEN user.updatedAt
             WHEN datetime($now) > user.updatedAt THEN datetime($now)
             ELSE user.updatedAt + duration({nanoseconds: 1})
           END
       RETURN matched";

/// User repository backed by a Neo4j graph
#[derive(Clone)]
pub struct Neo4jUserRepository {
    graph: Graph,
}

impl std::fmt::Debug for Neo4jUserRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jUserRepository").finish_non_exhaustive()
    }
}

impl Neo4jUserRepository {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    async fn first_row(&self, statement: Query) -> StorageResult<Option<Row>> {
        let mut rows = self.graph.execute(statement).await?;
        Ok(rows.next().await?)
    }
}

#[async_trait]
impl UserRepository for Neo4jUserRepository {
    fn backend(&self) -> &'static str {
        "neo4j"
    }

    async fn get_by_id(&self, id: &UserId) -> Result<User> {
        let Some(node_id) = id.as_i64() else {
            return Err(UserError::UserNotFound(id.clone()));
        };

        let statement = query(&format!("{MATCH_USER}\n{RETURN_USER}")).param("id", node_id);
        match self.first_row(statement).await? {
            Some(row) => Ok(row_to_user(&row)?),
            None => Err(UserError::UserNotFound(id.clone())),
        }
    }

    async fn create(&self, user: CreateUser) -> Result<User> {
        let statement = query(&format!("{CREATE_USER}\n{RETURN_USER}"))
            .param("username", user.username)
            .param("name", user.name)
            .param("surname", user.surname)
            .param("password", user.password)
            .param("age", i64::from(user.age))
            .param("now", format_timestamp(Utc::now()));

        let row = self
            .first_row(statement)
            .await?
            .ok_or_else(|| StorageError::invalid_data("CREATE returned no row"))?;
        let created = row_to_user(&row)?;

        tracing::debug!(backend = "neo4j", user_id = %created.id, "Created user");
        Ok(created)
    }

    async fn update_password(&self, update: PasswordUpdate) -> Result<PasswordUpdated> {
        let Some(node_id) = update.id.as_i64() else {
            return Err(UserError::UserNotFound(update.id.clone()));
        };

        let statement = query(UPDATE_PASSWORD)
            .param("id", node_id)
            .param("password", update.password)
            .param("newPassword", update.new_password)
            .param("now", format_timestamp(Utc::now()));

        let Some(row) = self.first_row(statement).await? else {
            return Err(UserError::UserNotFound(update.id));
        };
        let matched: bool = row.get("matched").map_err(StorageError::from)?;
        if !matched {
            return Err(UserError::PasswordMismatch(update.id));
        }

        tracing::debug!(backend = "neo4j", user_id = node_id, "Updated password");
        Ok(PasswordUpdated {
            id: UserId::Numeric(node_id),
        })
    }
}

fn row_to_user(row: &Row) -> StorageResult<User> {
    let age: i64 = row.get("age")?;
    let age = i32::try_from(age)
        .map_err(|_| StorageError::invalid_data(format!("age out of range: {age}")))?;
    let created_at: String = row.get("createdAt")?;
    let updated_at: String = row.get("updatedAt")?;

    Ok(User {
        id: UserId::Numeric(row.get("id")?),
        username: row.get("username")?,
        name: row.get("name")?,
        surname: row.get("surname")?,
        password: row.get("password")?,
        age,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a Neo4j `toString(datetime)` value
///
/// Neo4j drops the seconds when they and the fraction are zero
/// (`2024-01-02T03:04Z`) and may append a zone name in brackets.
fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    let trimmed = raw.split('[').next().unwrap_or(raw);
    let normalized = with_seconds(trimmed);

    DateTime::parse_from_rfc3339(&normalized)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| StorageError::invalid_data(format!("bad timestamp {raw:?}: {e}")))
}

fn with_seconds(value: &str) -> String {
    let Some((date, time)) = value.split_once('T') else {
        return value.to_string();
    };
    let offset_at = time.find(['Z', 'z', '+', '-']).unwrap_or(time.len());
    let (clock, offset) = time.split_at(offset_at);

    if clock.matches(':').count() == 1 {
        format!("{date}T{clock}:00{offset}")
    } else {
        value.to_string()
    }
}

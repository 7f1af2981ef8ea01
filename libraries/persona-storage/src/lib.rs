//! Persona Storage
//!
//! Backend adapters for the [`UserRepository`](persona_core::UserRepository)
//! contract.
//!
//! # Architecture
//!
//! - **One adapter per engine**: PostgreSQL, CockroachDB, MongoDB, Neo4j and
//!   an in-process map all satisfy the same contract
//! - **Shared SQL**: the PostgreSQL and CockroachDB adapters run the same
//!   statements; only the transaction handling differs
//! - **Retrying writes**: CockroachDB writes go through [`RetryingExecutor`],
//!   which restarts a transaction on serialization conflicts
//! - **Opaque failures**: backend errors leave the crate as
//!   [`UserError::OperationFailed`](persona_core::UserError::OperationFailed)
//!
//! # Example
//!
//! ```rust,no_run
//! use persona_core::{CreateUser, UserRepository};
//! use persona_storage::{create_pg_pool, CockroachUserRepository, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pg_pool("postgresql://root@localhost:26257/defaultdb", 5).await?;
//! let users = CockroachUserRepository::initialize(pool, RetryPolicy::default()).await?;
//!
//! let alice = users
//!     .create(CreateUser {
//!         username: "alice".to_string(),
//!         name: "Alice".to_string(),
//!         surname: "A".to_string(),
//!         age: 30,
//!         password: "p1".to_string(),
//!     })
//!     .await?;
//! assert_eq!(users.get_by_id(&alice.id).await?, alice);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod schema;

pub mod cockroach;
pub mod memory;
pub mod mongo;
pub mod neo4j;
pub mod postgres;
pub mod retry;

pub use cockroach::CockroachUserRepository;
pub use error::{StorageError, RETRYABLE_SQLSTATES};
pub use memory::InMemoryUserRepository;
pub use mongo::MongoUserRepository;
pub use neo4j::Neo4jUserRepository;
pub use postgres::PostgresUserRepository;
pub use retry::{AttemptOutcome, RetryPolicy, RetryingExecutor, Sleeper, TokioSleeper};
pub use schema::ensure_users_table;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Create a PostgreSQL wire-protocol pool
///
/// Works for both PostgreSQL and CockroachDB URLs.
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pg_pool(database_url: &str, max_connections: u32) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Database pool created");
    Ok(pool)
}

/// Create a MongoDB client from a connection string
///
/// # Errors
///
/// Returns an error if the URI cannot be parsed or the driver fails to start
pub async fn create_mongo_client(uri: &str) -> Result<mongodb::Client, StorageError> {
    let client = mongodb::Client::with_uri_str(uri).await?;
    tracing::info!("MongoDB client created");
    Ok(client)
}

/// Create a Neo4j driver handle with basic auth
///
/// # Errors
///
/// Returns an error if the driver cannot be configured or reach the server
pub async fn create_neo4j_graph(
    uri: &str,
    user: &str,
    password: &str,
) -> Result<neo4rs::Graph, StorageError> {
    let graph = neo4rs::Graph::new(uri, user, password).await?;
    tracing::info!("Neo4j graph created");
    Ok(graph)
}

/// Composition root for the storage backend
///
/// Picks one repository implementation from configuration, owns the driver
/// handle behind it and releases that handle on shutdown. Repositories never
/// open or close connections themselves.
use crate::config::{BackendKind, DatabaseSettings};
use crate::error::Result;
use persona_core::UserRepository;
use persona_storage::{
    create_mongo_client, create_neo4j_graph, create_pg_pool, CockroachUserRepository,
    InMemoryUserRepository, MongoUserRepository, Neo4jUserRepository, PostgresUserRepository,
};
use sqlx::PgPool;
use std::sync::Arc;

/// Driver handle kept for shutdown
enum Handle {
    Pool(PgPool),
    Mongo(mongodb::Client),
    None,
}

/// Connected backend
pub struct Backend {
    kind: BackendKind,
    repository: Arc<dyn UserRepository>,
    handle: Handle,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("kind", &self.kind)
            .field("repository", &self.repository.backend())
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// Connect to the configured backend and build its repository
    ///
    /// CockroachDB gets its `users` table created here if it is missing.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let kind = settings.backend;
        tracing::info!(backend = kind.as_str(), "Connecting to storage backend");

        let (repository, handle): (Arc<dyn UserRepository>, Handle) = match kind {
            BackendKind::Postgres => {
                let pool =
                    create_pg_pool(&settings.postgres.url, settings.postgres.max_connections)
                        .await?;
                (
                    Arc::new(PostgresUserRepository::new(pool.clone())),
                    Handle::Pool(pool),
                )
            }
            BackendKind::CockroachDb => {
                let cockroach = &settings.cockroach;
                let pool = create_pg_pool(&cockroach.url, cockroach.max_connections).await?;
                let repository =
                    CockroachUserRepository::initialize(pool.clone(), cockroach.retry_policy())
                        .await?;
                (Arc::new(repository), Handle::Pool(pool))
            }
            BackendKind::MongoDb => {
                let mongo = &settings.mongodb;
                let client = create_mongo_client(&mongo.uri).await?;
                let repository =
                    MongoUserRepository::from_client(&client, &mongo.database, &mongo.collection);
                (Arc::new(repository), Handle::Mongo(client))
            }
            BackendKind::Neo4j => {
                let neo4j = &settings.neo4j;
                let graph = create_neo4j_graph(&neo4j.uri, &neo4j.user, &neo4j.password).await?;
                (Arc::new(Neo4jUserRepository::new(graph)), Handle::None)
            }
            BackendKind::Memory => (Arc::new(InMemoryUserRepository::new()), Handle::None),
        };

        Ok(Self {
            kind,
            repository,
            handle,
        })
    }

    /// Wrap an existing repository; nothing to release on close
    pub fn from_repository(kind: BackendKind, repository: Arc<dyn UserRepository>) -> Self {
        Self {
            kind,
            repository,
            handle: Handle::None,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn repository(&self) -> Arc<dyn UserRepository> {
        Arc::clone(&self.repository)
    }

    /// Release the driver handle
    pub async fn close(self) {
        // Drop our reference first; the mongo client waits for live handles
        drop(self.repository);

        match self.handle {
            Handle::Pool(pool) => pool.close().await,
            Handle::Mongo(client) => client.shutdown().await,
            Handle::None => {}
        }
        tracing::info!(backend = self.kind.as_str(), "Storage backend closed");
    }
}

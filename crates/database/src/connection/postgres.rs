//! PostgreSQL connection backed by a sqlx pool

use super::{unknown_entity, Connection, Repository, RepositoryKind};
use crate::entity::EntityDescriptor;
use crate::error::{DatabaseError, DatabaseResult};
use crate::options::{ConnectionOptions, DriverType, PoolConfig};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pool options built from the connection's pool configuration
pub fn pool_options(config: &PoolConfig) -> PgPoolOptions {
    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
        .test_before_acquire(config.test_before_acquire);

    if let Some(idle_timeout) = config.idle_timeout {
        options = options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    if let Some(max_lifetime) = config.max_lifetime {
        options = options.max_lifetime(Duration::from_secs(max_lifetime));
    }

    options
}

/// PostgreSQL connection pool registered under a logical name
pub struct PostgresConnection {
    name: String,
    pool: Pool<Postgres>,
    entities: Vec<EntityDescriptor>,
}

impl PostgresConnection {
    /// Open a pool for the given options
    pub async fn connect(options: &ConnectionOptions) -> DatabaseResult<Self> {
        let name = options.connection_name();
        let url = options.connection_url()?;

        tracing::info!("Connecting to PostgreSQL '{}' at {}", name, options.redacted_url());

        let pool = pool_options(&options.pool).connect(&url).await?;

        tracing::info!(
            "PostgreSQL connection '{}' ready (max_connections={}, min_connections={})",
            name,
            options.pool.max_connections,
            options.pool.min_connections
        );

        Ok(Self::from_pool(name, pool, options.entities.to_vec()))
    }

    /// Wrap an existing pool
    pub fn from_pool(name: impl Into<String>, pool: Pool<Postgres>, entities: Vec<EntityDescriptor>) -> Self {
        Self {
            name: name.into(),
            pool,
            entities,
        }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Run a trivial query and report the round-trip time
    pub async fn health_check(&self) -> DatabaseResult<Duration> {
        let start = Instant::now();
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::connection(&self.name, format!("Health check failed: {}", e)))?;
        Ok(start.elapsed())
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver(&self) -> DriverType {
        DriverType::Postgres
    }

    fn is_initialized(&self) -> bool {
        !self.pool.is_closed()
    }

    fn entities(&self) -> Vec<EntityDescriptor> {
        self.entities.clone()
    }

    fn repository(&self, entity: &EntityDescriptor) -> DatabaseResult<Arc<dyn Repository>> {
        if !self.entities.contains(entity) {
            return Err(unknown_entity(&self.name, entity));
        }

        Ok(Arc::new(PostgresRepository {
            entity: *entity,
            connection_name: self.name.clone(),
            pool: self.pool.clone(),
        }))
    }

    async fn close(&self) -> DatabaseResult<()> {
        tracing::info!("Closing PostgreSQL connection '{}'", self.name);
        self.pool.close().await;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Table-scoped access to a PostgreSQL entity
pub struct PostgresRepository {
    entity: EntityDescriptor,
    connection_name: String,
    pool: Pool<Postgres>,
}

impl PostgresRepository {
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Quoted table identifier
    pub fn table(&self) -> String {
        format!("\"{}\"", self.entity.table().replace('"', "\"\""))
    }

    /// Number of rows in the entity's table
    pub async fn count(&self) -> DatabaseResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// All rows of the entity's table as JSON objects
    pub async fn all_json(&self) -> DatabaseResult<Vec<serde_json::Value>> {
        let sql = format!("SELECT row_to_json(t) FROM {} t", self.table());
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

impl Repository for PostgresRepository {
    fn entity(&self) -> EntityDescriptor {
        self.entity
    }

    fn connection_name(&self) -> &str {
        &self.connection_name
    }

    fn kind(&self) -> RepositoryKind {
        RepositoryKind::Relational
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

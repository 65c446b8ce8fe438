//! Connection bootstrap
//!
//! Turns [`ConnectionOptions`] into a live connection: reuses a kept-alive
//! connection when one is available, assembles the entity list (merging
//! registered entities when auto-loading), and runs the factory under the
//! retry policy the options describe.

use crate::connection::Connection;
use crate::entity::{extend_unique, EntityDescriptor, EntitySource};
use crate::error::DatabaseResult;
use crate::factory::{ConnectionFactory, SqlxConnectionFactory};
use crate::manager::ConnectionManager;
use crate::options::ConnectionOptions;
use crate::registry::EntityRegistry;
use crate::retry::{retry_with_policy, RetryPolicy};
use std::sync::Arc;

/// Creates connections and records them by logical name
#[derive(Clone)]
pub struct ConnectionBootstrapper {
    registry: Arc<EntityRegistry>,
    manager: Arc<ConnectionManager>,
    factory: Arc<dyn ConnectionFactory>,
}

impl ConnectionBootstrapper {
    /// Bootstrapper using the sqlx connection factory
    pub fn new(registry: Arc<EntityRegistry>, manager: Arc<ConnectionManager>) -> Self {
        Self {
            registry,
            manager,
            factory: Arc::new(SqlxConnectionFactory::new()),
        }
    }

    /// Replace the connection factory
    pub fn with_factory<F: ConnectionFactory>(mut self, factory: F) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Replace the connection factory with a shared one
    pub fn with_shared_factory(mut self, factory: Arc<dyn ConnectionFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn factory(&self) -> &Arc<dyn ConnectionFactory> {
        &self.factory
    }

    /// Create (or reuse) the connection described by `options`
    ///
    /// Failures are retried according to the options' retry settings; the
    /// final error is returned unchanged.
    pub async fn create_connection(&self, options: &ConnectionOptions) -> DatabaseResult<Arc<dyn Connection>> {
        let name = options.connection_name();

        if options.keep_connection_alive {
            if let Some(existing) = self.manager.get_initialized(&name) {
                tracing::debug!("Reusing kept-alive connection '{}'", name);
                return Ok(existing);
            }
        }

        let policy = RetryPolicy::from_options(options);
        let logical_name = name.as_str();

        let connection = retry_with_policy(
            &policy,
            || self.attempt(options, logical_name),
            |err| options.should_retry(err),
        )
        .await?;

        if self.manager.insert(name.clone(), connection.clone()).is_some() {
            tracing::debug!("Replaced previous connection '{}' in the manager", name);
        }
        tracing::info!(
            "Database connection '{}' initialized ({}, {} entities)",
            name,
            connection.driver(),
            connection.entities().len()
        );

        Ok(connection)
    }

    /// Entities a connection created from `options` would be given
    ///
    /// With auto-loading, configured entities come first followed by the
    /// registry's entities for the logical name; repeats are dropped. Without
    /// it, the configured entities as they are.
    pub fn resolve_entities(&self, options: &ConnectionOptions) -> Vec<EntityDescriptor> {
        let mut entities = options.entities.to_vec();
        if options.auto_load_entities {
            extend_unique(&mut entities, self.registry.lookup(options));
        }
        entities
    }

    /// Options handed to the factory: named, with entities resolved
    pub fn prepare_options(&self, options: &ConnectionOptions, name: &str) -> ConnectionOptions {
        let mut prepared = options.clone();
        prepared.name = Some(name.to_string());

        if options.auto_load_entities {
            prepared.entities = EntitySource::List(self.resolve_entities(options));
        }

        prepared
    }

    async fn attempt(&self, options: &ConnectionOptions, name: &str) -> DatabaseResult<Arc<dyn Connection>> {
        if options.driver.is_none() {
            return self.factory.connect_from_environment(name).await;
        }

        let prepared = self.prepare_options(options, name);
        self.factory.connect(&prepared).await
    }
}

impl std::fmt::Debug for ConnectionBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionBootstrapper")
            .field("registry", &self.registry)
            .field("manager", &self.manager)
            .finish()
    }
}

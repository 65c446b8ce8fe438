//! Database module providers
//!
//! [`DatabaseModule`] owns the state shared by every database provider of an
//! application (entity registry, connection manager, connection factory) and
//! hands out the providers that wire connections and repositories into the
//! container:
//!
//! ```ignore
//! let database = DatabaseModule::new();
//!
//! let users = database.for_feature(entities![User, Profile], ConnectionKey::Default);
//! let root = database.for_root(
//!     ConnectionOptions::from_url("postgres://app@localhost/app").with_auto_load_entities(true),
//! );
//!
//! let mut lifecycle = ProviderLifecycleManager::new();
//! lifecycle.register(users)?;
//! root.register_into(&mut lifecycle)?;
//! let container = lifecycle.execute_lifecycle().await?;
//!
//! let users = container.resolve::<RepositoryHandle>("UserRepository")?;
//! ```

use crate::async_options::{AsyncConnectionOptions, OptionsResolver};
use crate::bootstrap::ConnectionBootstrapper;
use crate::connection::Connection;
use crate::entity::EntityDescriptor;
use crate::factory::{ConnectionFactory, SqlxConnectionFactory};
use crate::manager::ConnectionManager;
use crate::options::{ConnectionOptions, DEFAULT_CONNECTION_NAME};
use crate::registry::{ConnectionKey, EntityRegistry};
use crate::repository::RepositoryHandle;
use crate::tokens::{connection_token, options_token, repository_token, CONNECTION_MANAGER_TOKEN, ENTITY_REGISTRY_TOKEN};
use async_trait::async_trait;
use elif_core::{Container, ProviderError, ProviderLifecycleManager, ServiceProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared state and provider constructors for database integration
pub struct DatabaseModule {
    registry: Arc<EntityRegistry>,
    manager: Arc<ConnectionManager>,
    factory: Arc<dyn ConnectionFactory>,
    features: AtomicUsize,
}

impl DatabaseModule {
    /// Module opening connections through sqlx
    pub fn new() -> Self {
        Self {
            registry: Arc::new(EntityRegistry::new()),
            manager: Arc::new(ConnectionManager::new()),
            factory: Arc::new(SqlxConnectionFactory::new()),
            features: AtomicUsize::new(0),
        }
    }

    /// Use another connection factory for every root created afterwards
    pub fn with_factory<F: ConnectionFactory>(mut self, factory: F) -> Self {
        self.factory = Arc::new(factory);
        self
    }

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

    /// Bootstrapper sharing this module's registry, manager and factory
    pub fn bootstrapper(&self) -> ConnectionBootstrapper {
        ConnectionBootstrapper::new(self.registry.clone(), self.manager.clone())
            .with_shared_factory(self.factory.clone())
    }

    /// Root provider for a connection with static options
    pub fn for_root(&self, options: ConnectionOptions) -> DatabaseRootProvider {
        let connection_name = options.connection_name();
        DatabaseRootProvider::new(
            connection_name,
            RootOptions::Static(Box::new(options)),
            self.bootstrapper(),
            Vec::new(),
        )
    }

    /// Root provider whose options are resolved during boot
    pub fn for_root_async(&self, options: AsyncConnectionOptions) -> DatabaseRootProvider {
        let connection_name = options
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_CONNECTION_NAME.to_string());
        let resolver = options.source.into_resolver(options.name);

        DatabaseRootProvider::new(
            connection_name,
            RootOptions::Async(resolver),
            self.bootstrapper(),
            options.imports,
        )
    }

    /// Feature provider binding repositories for `entities`
    ///
    /// The entities are added to the registry immediately, so an auto-loading
    /// root picks them up whatever order the providers are registered in.
    pub fn for_feature<K: Into<ConnectionKey>>(&self, entities: Vec<EntityDescriptor>, key: K) -> DatabaseFeatureProvider {
        let connection_name = key.into().resolve();
        self.registry.register(connection_name.as_str(), entities.iter().copied());

        let index = self.features.fetch_add(1, Ordering::SeqCst);
        DatabaseFeatureProvider {
            provider_name: format!("database.feature.{}.{}", connection_name, index),
            connection_name,
            entities,
            manager: self.manager.clone(),
        }
    }
}

impl Default for DatabaseModule {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DatabaseModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseModule")
            .field("registry", &self.registry)
            .field("manager", &self.manager)
            .field("features", &self.features.load(Ordering::SeqCst))
            .finish()
    }
}

enum RootOptions {
    Static(Box<ConnectionOptions>),
    Async(OptionsResolver),
}

struct BootedConnection {
    connection: Arc<dyn Connection>,
    keep_alive: bool,
}

/// Provider creating one connection and binding it under its connection token
pub struct DatabaseRootProvider {
    provider_name: String,
    connection_name: String,
    options: RootOptions,
    bootstrapper: ConnectionBootstrapper,
    imports: Vec<Box<dyn ServiceProvider>>,
    import_names: Vec<String>,
    booted: Mutex<Option<BootedConnection>>,
}

impl DatabaseRootProvider {
    fn new(
        connection_name: String,
        options: RootOptions,
        bootstrapper: ConnectionBootstrapper,
        imports: Vec<Box<dyn ServiceProvider>>,
    ) -> Self {
        let import_names = imports.iter().map(|provider| provider.name().to_string()).collect();
        Self {
            provider_name: format!("database.root.{}", connection_name),
            connection_name,
            options,
            bootstrapper,
            imports,
            import_names,
            booted: Mutex::new(None),
        }
    }

    /// Logical name of the connection this provider creates
    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    /// Imported providers followed by this provider
    pub fn into_providers(mut self) -> Vec<Box<dyn ServiceProvider>> {
        let mut providers = std::mem::take(&mut self.imports);
        providers.push(Box::new(self));
        providers
    }

    /// Register the imports and this provider with a lifecycle manager
    pub fn register_into(self, lifecycle: &mut ProviderLifecycleManager) -> Result<(), ProviderError> {
        for provider in self.into_providers() {
            lifecycle.register_boxed(provider)?;
        }
        Ok(())
    }

    async fn resolve_options(&self, container: &Container) -> Result<ConnectionOptions, ProviderError> {
        match &self.options {
            RootOptions::Static(options) => Ok(options.as_ref().clone()),
            RootOptions::Async(resolve) => {
                let options = resolve(container).await?.with_name(self.connection_name.clone());
                container.bind(options_token(&self.connection_name), options.clone())?;
                Ok(options)
            }
        }
    }
}

#[async_trait]
impl ServiceProvider for DatabaseRootProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn register(&self, container: &Container) -> Result<(), ProviderError> {
        container.bind(CONNECTION_MANAGER_TOKEN, self.bootstrapper.manager().clone())?;
        container.bind(ENTITY_REGISTRY_TOKEN, self.bootstrapper.registry().clone())?;

        if let RootOptions::Static(options) = &self.options {
            container.bind(options_token(&self.connection_name), options.as_ref().clone())?;
        }
        Ok(())
    }

    async fn boot(&self, container: &Container) -> Result<(), ProviderError> {
        let options = self.resolve_options(container).await?;
        let connection = self.bootstrapper.create_connection(&options).await?;

        container.bind(connection_token(&self.connection_name), connection.clone())?;

        *self.booted.lock().unwrap_or_else(PoisonError::into_inner) = Some(BootedConnection {
            connection,
            keep_alive: options.keep_connection_alive,
        });
        Ok(())
    }

    async fn shutdown(&self, container: &Container) -> Result<(), ProviderError> {
        let booted = self.booted.lock().unwrap_or_else(PoisonError::into_inner).take();
        container.unbind(&connection_token(&self.connection_name));

        let Some(booted) = booted else {
            return Ok(());
        };

        if booted.keep_alive {
            tracing::info!("Keeping connection '{}' alive", self.connection_name);
            return Ok(());
        }

        self.bootstrapper.manager().remove(&self.connection_name);
        match booted.connection.close().await {
            Ok(()) => tracing::info!("Closed connection '{}'", self.connection_name),
            Err(e) => tracing::error!("Failed to close connection '{}': {}", self.connection_name, e),
        }
        Ok(())
    }

    fn dependencies(&self) -> Vec<String> {
        self.import_names.clone()
    }

    fn description(&self) -> Option<&'static str> {
        Some("Creates a database connection and closes it at shutdown")
    }
}

/// Provider binding a [`RepositoryHandle`] per entity
pub struct DatabaseFeatureProvider {
    provider_name: String,
    connection_name: String,
    entities: Vec<EntityDescriptor>,
    manager: Arc<ConnectionManager>,
}

impl DatabaseFeatureProvider {
    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }
}

#[async_trait]
impl ServiceProvider for DatabaseFeatureProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn register(&self, container: &Container) -> Result<(), ProviderError> {
        for entity in &self.entities {
            let token = repository_token(entity, &self.connection_name);
            let handle = RepositoryHandle::new(*entity, self.connection_name.clone(), self.manager.clone());
            container.bind(token, handle)?;
        }
        Ok(())
    }

    fn description(&self) -> Option<&'static str> {
        Some("Binds entity repositories")
    }
}

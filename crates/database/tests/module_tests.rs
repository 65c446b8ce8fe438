//! Database providers driven through the elif-core provider lifecycle

mod common;

use async_trait::async_trait;
use common::{AuditLog, Comment, Post, User, WarnCapture};
use elif_core::{Container, LifecycleState, ProviderError, ProviderLifecycleManager, ServiceProvider};
use elif_database::{
    entities, AsyncConnectionOptions, Connection, ConnectionKey, ConnectionOptions, ConnectionOptionsFactory,
    DatabaseError, DatabaseModule, DatabaseResult, DriverType, FromContainer, MemoryConnection,
    MemoryConnectionFactory, RepositoryHandle, RepositoryKind,
};
use std::sync::Arc;

fn sqlite(name: &str) -> ConnectionOptions {
    ConnectionOptions::new(DriverType::Sqlite)
        .with_name(name)
        .with_database(format!("{}.db", name))
}

fn memory_module() -> (DatabaseModule, Arc<MemoryConnectionFactory>) {
    let factory = Arc::new(MemoryConnectionFactory::new());
    let module = DatabaseModule::new().with_factory(factory.clone());
    (module, factory)
}

#[tokio::test]
async fn root_and_features_wire_connection_and_repositories() {
    let (module, factory) = memory_module();
    let mut lifecycle = ProviderLifecycleManager::new();

    lifecycle
        .register(module.for_feature(entities![User, Post], ConnectionKey::Default))
        .unwrap();
    module
        .for_root(sqlite("default").with_auto_load_entities(true))
        .register_into(&mut lifecycle)
        .unwrap();
    // Registered after the root, still picked up by auto-loading
    lifecycle
        .register(module.for_feature(entities![Comment], ConnectionKey::Default))
        .unwrap();

    let container = lifecycle.execute_lifecycle().await.unwrap();

    let connection = container.resolve::<Arc<dyn Connection>>("DatabaseConnection").unwrap();
    assert_eq!(connection.entities(), entities![User, Post, Comment]);
    assert_eq!(factory.calls(), 1);

    let users = container.resolve::<RepositoryHandle>("UserRepository").unwrap();
    let repository = users.get().await.unwrap();
    assert_eq!(repository.kind(), RepositoryKind::Relational);
    assert!(repository.entity().is::<User>());
    assert!(container.contains("CommentRepository"));
}

#[tokio::test]
async fn named_document_connection_uses_prefixed_tokens() {
    let (module, _factory) = memory_module();
    let mut lifecycle = ProviderLifecycleManager::new();

    let options = ConnectionOptions::new(DriverType::MongoDb)
        .with_name("audit")
        .with_url("mongodb://localhost:27017/audit")
        .with_auto_load_entities(true);

    lifecycle.register(module.for_feature(entities![AuditLog], "audit")).unwrap();
    module.for_root(options).register_into(&mut lifecycle).unwrap();

    let container = lifecycle.execute_lifecycle().await.unwrap();

    assert!(container.contains("auditDatabaseConnection"));
    assert!(!container.contains("DatabaseConnection"));

    let handle = container.resolve::<RepositoryHandle>("audit_AuditLogRepository").unwrap();
    let repository = handle.get().await.unwrap();
    assert_eq!(repository.kind(), RepositoryKind::Document);
    assert_eq!(repository.connection_name(), "audit");
}

#[tokio::test]
async fn shutdown_closes_connection_once() {
    let (module, _factory) = memory_module();
    let mut lifecycle = ProviderLifecycleManager::new();
    module.for_root(sqlite("default")).register_into(&mut lifecycle).unwrap();

    let container = lifecycle.execute_lifecycle().await.unwrap();
    let connection = container.resolve::<Arc<dyn Connection>>("DatabaseConnection").unwrap();

    assert!(lifecycle.shutdown().await);
    assert!(!lifecycle.shutdown().await);

    let memory = connection.downcast_ref::<MemoryConnection>().unwrap();
    assert_eq!(memory.close_count(), 1);
    assert!(!connection.is_initialized());
    assert!(module.manager().is_empty());
    assert!(!container.contains("DatabaseConnection"));
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn kept_alive_connection_survives_shutdown_and_is_reused() {
    let (module, factory) = memory_module();
    let options = sqlite("default").with_keep_connection_alive(true);

    let mut first = ProviderLifecycleManager::new();
    module.for_root(options.clone()).register_into(&mut first).unwrap();
    let container = first.execute_lifecycle().await.unwrap();
    let connection = container.resolve::<Arc<dyn Connection>>("DatabaseConnection").unwrap();
    first.shutdown().await;

    assert!(connection.is_initialized());

    let mut second = ProviderLifecycleManager::new();
    module.for_root(options).register_into(&mut second).unwrap();
    let container = second.execute_lifecycle().await.unwrap();
    let reused = container.resolve::<Arc<dyn Connection>>("DatabaseConnection").unwrap();

    assert!(Arc::ptr_eq(&connection, &reused));
    assert_eq!(factory.calls(), 1);
}

#[tokio::test]
async fn close_failure_is_logged_not_raised() {
    let factory = MemoryConnectionFactory::new().with_failing_close();
    let module = DatabaseModule::new().with_factory(factory);
    let mut lifecycle = ProviderLifecycleManager::new();
    let root = module.for_root(sqlite("default"));
    let container = Container::new();

    root.boot(&container).await.unwrap();
    assert!(root.shutdown(&container).await.is_ok());

    module.for_root(sqlite("default")).register_into(&mut lifecycle).unwrap();
    lifecycle.execute_lifecycle().await.unwrap();
    assert!(lifecycle.shutdown().await);
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_the_boot() {
    let (warnings, _guard) = WarnCapture::install();
    let factory = Arc::new(MemoryConnectionFactory::always_failing(|_| {
        DatabaseError::connection("default", "connection refused")
    }));
    let module = DatabaseModule::new().with_factory(factory.clone());
    let mut lifecycle = ProviderLifecycleManager::new();
    module
        .for_root(sqlite("default").with_retry_attempts(3))
        .register_into(&mut lifecycle)
        .unwrap();

    let err = lifecycle.execute_lifecycle().await.err().unwrap();

    assert!(matches!(err, ProviderError::BootFailed { .. }));
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(lifecycle.state(), LifecycleState::Failed);
    assert_eq!(factory.calls(), 3);
    assert_eq!(warnings.count(), 2);
}

#[tokio::test]
async fn host_can_classify_boot_failures() {
    let factory = MemoryConnectionFactory::always_failing(|_| DatabaseError::Authentication {
        connection: "default".to_string(),
        message: "password authentication failed".to_string(),
    });
    let module = DatabaseModule::new().with_factory(factory);
    let mut lifecycle = ProviderLifecycleManager::new();
    module
        .for_root(sqlite("default").with_retry_predicate(|err| !err.is_authentication()))
        .register_into(&mut lifecycle)
        .unwrap();

    let err = lifecycle.execute_lifecycle().await.err().unwrap();

    let cause = err.find_source::<DatabaseError>().unwrap();
    assert!(cause.is_authentication());
}

struct SettingsFactory {
    database: String,
}

#[async_trait]
impl ConnectionOptionsFactory for SettingsFactory {
    async fn create_connection_options(&self, _connection_name: Option<&str>) -> DatabaseResult<ConnectionOptions> {
        Ok(ConnectionOptions::new(DriverType::Sqlite)
            .with_database(self.database.clone())
            .with_auto_load_entities(true))
    }
}

impl FromContainer for SettingsFactory {
    fn from_container(container: &Container) -> DatabaseResult<Self> {
        let database = container.resolve::<String>("SettingsDatabase")?;
        Ok(Self { database })
    }
}

/// Binds what the options factories need
struct SettingsProvider;

#[async_trait]
impl ServiceProvider for SettingsProvider {
    fn name(&self) -> &str {
        "settings"
    }

    fn register(&self, container: &Container) -> Result<(), ProviderError> {
        container.bind("SettingsDatabase", "reports.db".to_string())?;
        let factory: Arc<dyn ConnectionOptionsFactory> = Arc::new(SettingsFactory {
            database: "delegated.db".to_string(),
        });
        container.bind("SettingsFactory", factory)?;
        Ok(())
    }
}

#[tokio::test]
async fn async_options_from_existing_factory() {
    let (module, factory) = memory_module();
    let mut lifecycle = ProviderLifecycleManager::new();

    lifecycle.register(module.for_feature(entities![Post], "reports")).unwrap();
    module
        .for_root_async(
            AsyncConnectionOptions::from_existing("SettingsFactory")
                .with_name("reports")
                .with_import(SettingsProvider),
        )
        .register_into(&mut lifecycle)
        .unwrap();

    let container = lifecycle.execute_lifecycle().await.unwrap();

    let connection = container.resolve::<Arc<dyn Connection>>("reportsDatabaseConnection").unwrap();
    assert_eq!(connection.name(), "reports");
    assert_eq!(connection.entities(), entities![Post]);

    let received = factory.last_received().unwrap();
    assert_eq!(received.database.as_deref(), Some("delegated.db"));

    let bound = container.resolve::<ConnectionOptions>("reportsDatabaseModuleOptions").unwrap();
    assert_eq!(bound.connection_name(), "reports");
}

#[tokio::test]
async fn async_options_from_constructed_factory() {
    let (module, factory) = memory_module();
    let mut lifecycle = ProviderLifecycleManager::new();

    module
        .for_root_async(AsyncConnectionOptions::from_factory::<SettingsFactory>().with_import(SettingsProvider))
        .register_into(&mut lifecycle)
        .unwrap();

    let container = lifecycle.execute_lifecycle().await.unwrap();

    assert!(container.contains("DatabaseConnection"));
    assert_eq!(factory.last_received().unwrap().database.as_deref(), Some("reports.db"));
}

#[tokio::test]
async fn async_options_from_closure() {
    let (module, _factory) = memory_module();
    let mut lifecycle = ProviderLifecycleManager::new();

    module
        .for_root_async(
            AsyncConnectionOptions::from_fn(|container: Container| async move {
                let database = container.resolve::<String>("SettingsDatabase")?;
                Ok::<_, DatabaseError>(ConnectionOptions::new(DriverType::Sqlite).with_database(database))
            })
            .with_name("closure")
            .with_import(SettingsProvider),
        )
        .register_into(&mut lifecycle)
        .unwrap();

    let container = lifecycle.execute_lifecycle().await.unwrap();
    let connection = container.resolve::<Arc<dyn Connection>>("closureDatabaseConnection").unwrap();
    assert_eq!(connection.name(), "closure");
}

#[tokio::test]
async fn missing_options_factory_fails_the_boot() {
    let (module, factory) = memory_module();
    let mut lifecycle = ProviderLifecycleManager::new();

    module
        .for_root_async(AsyncConnectionOptions::from_existing("NotBound"))
        .register_into(&mut lifecycle)
        .unwrap();

    let err = lifecycle.execute_lifecycle().await.err().unwrap();
    assert!(err.to_string().contains("NotBound"));
    assert_eq!(factory.calls(), 0);
}

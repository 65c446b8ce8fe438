//! In-process connections
//!
//! [`MemoryConnection`] holds no resources and [`MemoryConnectionFactory`]
//! can be scripted to fail, which makes them the tools of choice for testing
//! bootstrap behaviour and for wiring applications without a database.

use crate::connection::{unknown_entity, Connection, Repository, RepositoryKind};
use crate::entity::EntityDescriptor;
use crate::error::{DatabaseError, DatabaseResult};
use crate::factory::ConnectionFactory;
use crate::options::{ConnectionOptions, DriverFamily, DriverType};
use async_trait::async_trait;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Connection that lives entirely in memory
#[derive(Debug)]
pub struct MemoryConnection {
    name: String,
    driver: DriverType,
    entities: Vec<EntityDescriptor>,
    initialized: AtomicBool,
    fail_close: bool,
    closes: AtomicUsize,
}

impl MemoryConnection {
    pub fn new(name: impl Into<String>, driver: DriverType, entities: Vec<EntityDescriptor>) -> Self {
        Self {
            name: name.into(),
            driver,
            entities,
            initialized: AtomicBool::new(true),
            fail_close: false,
            closes: AtomicUsize::new(0),
        }
    }

    /// Connection mirroring the name, driver and entities of `options`
    ///
    /// Options without a driver produce a sqlite connection.
    pub fn from_options(options: &ConnectionOptions) -> Self {
        Self::new(
            options.connection_name(),
            options.driver.unwrap_or(DriverType::Sqlite),
            options.entities.to_vec(),
        )
    }

    /// Make `close` report an error
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Number of times `close` was called
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn make_repository(&self, entity: &EntityDescriptor, kind: RepositoryKind) -> DatabaseResult<Arc<dyn Repository>> {
        if !self.entities.contains(entity) {
            return Err(unknown_entity(&self.name, entity));
        }

        Ok(Arc::new(MemoryRepository {
            entity: *entity,
            connection_name: self.name.clone(),
            kind,
        }))
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver(&self) -> DriverType {
        self.driver
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn entities(&self) -> Vec<EntityDescriptor> {
        self.entities.clone()
    }

    fn repository(&self, entity: &EntityDescriptor) -> DatabaseResult<Arc<dyn Repository>> {
        self.make_repository(entity, RepositoryKind::Relational)
    }

    fn document_repository(&self, entity: &EntityDescriptor) -> DatabaseResult<Arc<dyn Repository>> {
        if self.driver_family() != DriverFamily::Document {
            return Err(DatabaseError::UnsupportedDriver {
                driver: self.driver.to_string(),
                message: format!("connection '{}' is not a document store", self.name),
            });
        }
        self.make_repository(entity, RepositoryKind::Document)
    }

    async fn close(&self) -> DatabaseResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(DatabaseError::connection(&self.name, "close failed"));
        }
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Repository handed out by a [`MemoryConnection`]
#[derive(Debug)]
pub struct MemoryRepository {
    entity: EntityDescriptor,
    connection_name: String,
    kind: RepositoryKind,
}

impl Repository for MemoryRepository {
    fn entity(&self) -> EntityDescriptor {
        self.entity
    }

    fn connection_name(&self) -> &str {
        &self.connection_name
    }

    fn kind(&self) -> RepositoryKind {
        self.kind
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type FailureFn = dyn Fn(usize) -> DatabaseError + Send + Sync;

/// Factory producing [`MemoryConnection`]s, with scripted failures
///
/// Every call is counted and the options it received are recorded.
#[derive(Default)]
pub struct MemoryConnectionFactory {
    failures: Mutex<VecDeque<DatabaseError>>,
    always_fail: Option<Arc<FailureFn>>,
    failing_close: bool,
    calls: AtomicUsize,
    environment_calls: AtomicUsize,
    received: Mutex<Vec<ConnectionOptions>>,
}

impl MemoryConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` calls with connection errors, then succeed
    pub fn failing_times(count: usize) -> Self {
        let factory = Self::new();
        for attempt in 1..=count {
            factory.push_failure(DatabaseError::connection(
                "memory",
                format!("connection refused (attempt {})", attempt),
            ));
        }
        factory
    }

    /// Fail every call with the error `make` builds from the call number
    pub fn always_failing<F>(make: F) -> Self
    where
        F: Fn(usize) -> DatabaseError + Send + Sync + 'static,
    {
        Self {
            always_fail: Some(Arc::new(make)),
            ..Self::default()
        }
    }

    /// Created connections fail to close
    pub fn with_failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }

    /// Queue an error for the next call that would otherwise succeed
    pub fn push_failure(&self, error: DatabaseError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    /// Total connection attempts, including environment ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Attempts that went through `connect_from_environment`
    pub fn environment_calls(&self) -> usize {
        self.environment_calls.load(Ordering::SeqCst)
    }

    /// Options passed to `connect`, oldest first
    pub fn received(&self) -> Vec<ConnectionOptions> {
        self.received.lock().map(|received| received.clone()).unwrap_or_default()
    }

    /// Options passed to the latest `connect`
    pub fn last_received(&self) -> Option<ConnectionOptions> {
        self.received().pop()
    }

    fn attempt(&self, options: &ConnectionOptions) -> DatabaseResult<Arc<dyn Connection>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(make) = &self.always_fail {
            return Err(make(call));
        }

        let scripted = self.failures.lock().ok().and_then(|mut failures| failures.pop_front());
        if let Some(error) = scripted {
            return Err(error);
        }

        let mut connection = MemoryConnection::from_options(options);
        if self.failing_close {
            connection = connection.with_failing_close();
        }
        Ok(Arc::new(connection))
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    async fn connect(&self, options: &ConnectionOptions) -> DatabaseResult<Arc<dyn Connection>> {
        if let Ok(mut received) = self.received.lock() {
            received.push(options.clone());
        }
        self.attempt(options)
    }

    async fn connect_from_environment(&self, name: &str) -> DatabaseResult<Arc<dyn Connection>> {
        self.environment_calls.fetch_add(1, Ordering::SeqCst);
        self.attempt(&ConnectionOptions::default().with_name(name))
    }
}

//! Lazily resolved repositories

use crate::connection::{Connection, Repository};
use crate::entity::EntityDescriptor;
use crate::error::{DatabaseError, DatabaseResult};
use crate::manager::ConnectionManager;
use crate::options::DriverFamily;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Handle bound in the container for each registered entity
///
/// The connection usually does not exist yet when feature providers bind
/// their handles, so the repository is looked up on first use and cached.
/// Clones share the cache.
#[derive(Clone)]
pub struct RepositoryHandle {
    entity: EntityDescriptor,
    connection_name: String,
    manager: Arc<ConnectionManager>,
    repository: Arc<OnceCell<Arc<dyn Repository>>>,
}

impl RepositoryHandle {
    pub fn new(entity: EntityDescriptor, connection_name: impl Into<String>, manager: Arc<ConnectionManager>) -> Self {
        Self {
            entity,
            connection_name: connection_name.into(),
            manager,
            repository: Arc::new(OnceCell::new()),
        }
    }

    pub fn entity(&self) -> EntityDescriptor {
        self.entity
    }

    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    /// Whether the repository was already resolved
    pub fn is_resolved(&self) -> bool {
        self.repository.initialized()
    }

    /// The entity's repository, resolved from the connection on first call
    pub async fn get(&self) -> DatabaseResult<Arc<dyn Repository>> {
        self.repository
            .get_or_try_init(|| async { self.resolve() })
            .await
            .map(Arc::clone)
    }

    fn resolve(&self) -> DatabaseResult<Arc<dyn Repository>> {
        let connection = self
            .manager
            .get_initialized(&self.connection_name)
            .ok_or_else(|| DatabaseError::ConnectionNotInitialized {
                connection: self.connection_name.clone(),
            })?;

        tracing::debug!(
            "Resolving {} repository for '{}' on connection '{}'",
            match connection.driver_family() {
                DriverFamily::Document => "document",
                DriverFamily::Relational => "relational",
            },
            self.entity.name(),
            self.connection_name
        );

        repository_for(connection.as_ref(), &self.entity)
    }
}

/// Ask a connection for an entity's repository through the lookup its driver family uses
pub fn repository_for(connection: &dyn Connection, entity: &EntityDescriptor) -> DatabaseResult<Arc<dyn Repository>> {
    match connection.driver_family() {
        DriverFamily::Document => connection.document_repository(entity),
        DriverFamily::Relational => connection.repository(entity),
    }
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("entity", &self.entity.name())
            .field("connection", &self.connection_name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::RepositoryKind;
    use crate::entity::Entity;
    use crate::memory::MemoryConnection;
    use crate::options::DriverType;

    struct Event;
    impl Entity for Event {
        fn entity_name() -> &'static str {
            "Event"
        }
        fn table_name() -> &'static str {
            "events"
        }
    }

    #[tokio::test]
    async fn test_resolves_after_connection_appears() {
        let manager = Arc::new(ConnectionManager::new());
        let handle = RepositoryHandle::new(EntityDescriptor::of::<Event>(), "default", manager.clone());

        let err = handle.get().await.err().unwrap();
        assert!(matches!(err, DatabaseError::ConnectionNotInitialized { .. }));
        assert!(!handle.is_resolved());

        manager.insert(
            "default",
            Arc::new(MemoryConnection::new("default", DriverType::Postgres, crate::entities![Event])),
        );

        let repository = handle.get().await.unwrap();
        assert_eq!(repository.kind(), RepositoryKind::Relational);
        assert!(handle.clone().is_resolved());
    }

    #[tokio::test]
    async fn test_document_driver_uses_document_lookup() {
        let manager = Arc::new(ConnectionManager::new());
        manager.insert(
            "events",
            Arc::new(MemoryConnection::new("events", DriverType::MongoDb, crate::entities![Event])),
        );

        let handle = RepositoryHandle::new(EntityDescriptor::of::<Event>(), "events", manager);
        let repository = handle.get().await.unwrap();
        assert_eq!(repository.kind(), RepositoryKind::Document);
        assert_eq!(repository.connection_name(), "events");
    }
}

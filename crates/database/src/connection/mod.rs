//! Live connection abstraction
//!
//! A [`Connection`] is what the bootstrapper hands to the container: it knows
//! its logical name, its driver and the entities it was created with, and it
//! hands out repositories for those entities.

pub mod postgres;

use crate::entity::EntityDescriptor;
use crate::error::{DatabaseError, DatabaseResult};
use crate::options::{DriverFamily, DriverType};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

pub use postgres::{PostgresConnection, PostgresRepository};

/// Storage model a repository reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    Relational,
    Document,
}

/// Per-entity data access object handed out by a connection
pub trait Repository: Send + Sync {
    /// Entity this repository serves
    fn entity(&self) -> EntityDescriptor;

    /// Logical name of the owning connection
    fn connection_name(&self) -> &str;

    fn kind(&self) -> RepositoryKind;

    /// Access the concrete repository type
    fn as_any(&self) -> &dyn Any;
}

impl dyn Repository {
    /// Downcast to a concrete repository type
    pub fn downcast_ref<R: Repository + 'static>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }
}

/// A live database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Logical connection name
    fn name(&self) -> &str;

    fn driver(&self) -> DriverType;

    fn driver_family(&self) -> DriverFamily {
        self.driver().family()
    }

    /// Whether the connection is open and usable
    fn is_initialized(&self) -> bool;

    /// Entities the connection was created with
    fn entities(&self) -> Vec<EntityDescriptor>;

    /// Repository for a relational entity
    fn repository(&self, entity: &EntityDescriptor) -> DatabaseResult<Arc<dyn Repository>>;

    /// Repository for an entity stored in a document database
    fn document_repository(&self, entity: &EntityDescriptor) -> DatabaseResult<Arc<dyn Repository>> {
        Err(DatabaseError::UnsupportedDriver {
            driver: self.driver().to_string(),
            message: format!(
                "connection '{}' has no document repository for '{}'",
                self.name(),
                entity.name()
            ),
        })
    }

    /// Close the connection and release its resources
    async fn close(&self) -> DatabaseResult<()>;

    /// Access the concrete connection type
    fn as_any(&self) -> &dyn Any;
}

impl dyn Connection {
    /// Downcast to a concrete connection type
    pub fn downcast_ref<C: Connection + 'static>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }
}

/// Error for an entity the connection was not created with
pub(crate) fn unknown_entity(connection: &str, entity: &EntityDescriptor) -> DatabaseError {
    DatabaseError::RepositoryNotFound {
        entity: entity.name().to_string(),
        connection: connection.to_string(),
    }
}

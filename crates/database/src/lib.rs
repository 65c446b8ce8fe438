//! # elif-database
//!
//! Database integration for elif.rs applications: connection bootstrap with
//! retries, entity registration per logical connection, kept-alive connection
//! reuse, and service providers that bind connections and repositories into
//! the elif-core container.
//!
//! ## Pieces
//!
//! - [`ConnectionBootstrapper`] turns [`ConnectionOptions`] into a live
//!   [`Connection`] through a pluggable [`ConnectionFactory`].
//! - [`EntityRegistry`] accumulates entities per logical connection for
//!   auto-loading.
//! - [`DatabaseModule`] hands out the root and feature providers.

pub mod async_options;
pub mod bootstrap;
pub mod connection;
pub mod entity;
pub mod error;
pub mod factory;
pub mod manager;
pub mod memory;
pub mod module;
pub mod options;
pub mod registry;
pub mod repository;
pub mod retry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tokens;

pub use async_options::{
    AsyncConnectionOptions, ConnectionOptionsFactory, FromContainer, OptionsResolver, OptionsSource,
};
pub use bootstrap::ConnectionBootstrapper;
pub use connection::{Connection, PostgresConnection, PostgresRepository, Repository, RepositoryKind};
pub use entity::{Entity, EntityDescriptor, EntitySource};
pub use error::{DatabaseError, DatabaseResult};
pub use factory::{ConnectionFactory, FnConnectionFactory, SqlxConnectionFactory};
pub use manager::ConnectionManager;
pub use memory::{MemoryConnection, MemoryConnectionFactory, MemoryRepository};
pub use module::{DatabaseFeatureProvider, DatabaseModule, DatabaseRootProvider};
pub use options::{
    ConnectionOptions, DriverFamily, DriverType, PoolConfig, RetryPredicate, DEFAULT_CONNECTION_NAME,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS,
};
pub use registry::{ConnectionKey, EntityRegistry};
pub use repository::RepositoryHandle;
pub use retry::{retry_with_policy, RetryPolicy};
pub use tokens::{connection_prefix, connection_token, options_token, repository_token};

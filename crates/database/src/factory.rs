//! Connection factories
//!
//! The bootstrapper never opens connections itself; it asks a
//! [`ConnectionFactory`]. The default factory opens sqlx pools, tests and
//! custom pooling setups plug in their own.

use crate::connection::{Connection, PostgresConnection};
use crate::error::{DatabaseError, DatabaseResult};
use crate::options::{ConnectionOptions, DriverType};
use async_trait::async_trait;
use elif_core::AppConfigTrait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Environment variable pointing at a YAML connection file
pub const CONFIG_FILE_ENV: &str = "DATABASE_CONFIG_FILE";

/// Creates live connections from options
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Open a connection described by `options`
    async fn connect(&self, options: &ConnectionOptions) -> DatabaseResult<Arc<dyn Connection>>;

    /// Open a connection from external configuration
    ///
    /// Used when the options carry no driver. Reads the YAML file named by
    /// `DATABASE_CONFIG_FILE` when set, otherwise the `DATABASE_*` variables,
    /// and names the result `name`.
    async fn connect_from_environment(&self, name: &str) -> DatabaseResult<Arc<dyn Connection>> {
        let options = environment_options(name)?;
        self.connect(&options).await
    }
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn connect(&self, options: &ConnectionOptions) -> DatabaseResult<Arc<dyn Connection>> {
        (**self).connect(options).await
    }

    async fn connect_from_environment(&self, name: &str) -> DatabaseResult<Arc<dyn Connection>> {
        (**self).connect_from_environment(name).await
    }
}

/// Resolve connection options from the process environment
pub fn environment_options(name: &str) -> DatabaseResult<ConnectionOptions> {
    let options = match std::env::var(CONFIG_FILE_ENV) {
        Ok(path) => {
            tracing::debug!("Loading connection '{}' from {}", name, path);
            let options = ConnectionOptions::from_yaml_file(&path)?;
            options.validate()?;
            options
        }
        Err(_) => ConnectionOptions::from_env()?,
    };

    if options.driver.is_none() {
        return Err(DatabaseError::configuration(format!(
            "No driver configured for connection '{}': set DATABASE_URL, DATABASE_DRIVER or {}",
            name, CONFIG_FILE_ENV
        )));
    }

    Ok(options.with_name(name))
}

/// Default factory backed by sqlx pools
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlxConnectionFactory;

impl SqlxConnectionFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConnectionFactory for SqlxConnectionFactory {
    async fn connect(&self, options: &ConnectionOptions) -> DatabaseResult<Arc<dyn Connection>> {
        match options.driver {
            Some(DriverType::Postgres) => {
                let connection = PostgresConnection::connect(options).await?;
                Ok(Arc::new(connection))
            }
            Some(driver) => Err(DatabaseError::UnsupportedDriver {
                driver: driver.to_string(),
                message: "the sqlx factory only opens postgres connections; supply a custom ConnectionFactory"
                    .to_string(),
            }),
            None => self.connect_from_environment(&options.connection_name()).await,
        }
    }
}

type ConnectFn = dyn Fn(ConnectionOptions) -> BoxFuture<'static, DatabaseResult<Arc<dyn Connection>>> + Send + Sync;

/// Factory wrapping a closure
///
/// ```ignore
/// let factory = FnConnectionFactory::new(|options| Box::pin(async move {
///     let connection = MyPool::open(&options).await?;
///     Ok(Arc::new(connection) as Arc<dyn Connection>)
/// }));
/// ```
#[derive(Clone)]
pub struct FnConnectionFactory {
    connect: Arc<ConnectFn>,
}

impl FnConnectionFactory {
    pub fn new<F>(connect: F) -> Self
    where
        F: Fn(ConnectionOptions) -> BoxFuture<'static, DatabaseResult<Arc<dyn Connection>>> + Send + Sync + 'static,
    {
        Self {
            connect: Arc::new(connect),
        }
    }
}

#[async_trait]
impl ConnectionFactory for FnConnectionFactory {
    async fn connect(&self, options: &ConnectionOptions) -> DatabaseResult<Arc<dyn Connection>> {
        (self.connect)(options.clone()).await
    }
}

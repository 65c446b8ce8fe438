//! Connection options resolved at boot time
//!
//! Options often depend on other services (a secrets client, a config
//! service). [`OptionsSource`] names where they come from, and
//! [`OptionsSource::into_resolver`] turns that into one closure the root
//! provider calls during boot.

use crate::error::{DatabaseError, DatabaseResult};
use crate::options::ConnectionOptions;
use async_trait::async_trait;
use elif_core::{Container, ServiceProvider};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Service that produces connection options
#[async_trait]
pub trait ConnectionOptionsFactory: Send + Sync {
    async fn create_connection_options(&self, connection_name: Option<&str>) -> DatabaseResult<ConnectionOptions>;
}

/// Types that can be built from services already in the container
pub trait FromContainer: Sized {
    fn from_container(container: &Container) -> DatabaseResult<Self>;
}

/// Resolves connection options against a container
pub type OptionsResolver =
    Arc<dyn Fn(&Container) -> BoxFuture<'static, DatabaseResult<ConnectionOptions>> + Send + Sync>;

type ConstructFn = Arc<dyn Fn(&Container) -> DatabaseResult<Arc<dyn ConnectionOptionsFactory>> + Send + Sync>;

/// Where asynchronously resolved options come from
#[derive(Clone)]
pub enum OptionsSource {
    /// A closure producing the options
    Direct(OptionsResolver),
    /// A [`ConnectionOptionsFactory`] already bound in the container under this token
    Delegate(String),
    /// A [`ConnectionOptionsFactory`] built from the container on demand
    Construct(ConstructFn),
}

impl OptionsSource {
    /// Options from an async closure given a handle to the container
    pub fn direct<F, Fut>(resolve: F) -> Self
    where
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DatabaseResult<ConnectionOptions>> + Send + 'static,
    {
        OptionsSource::Direct(Arc::new(move |container: &Container| {
            Box::pin(resolve(container.clone())) as BoxFuture<'static, _>
        }))
    }

    /// Options from the factory bound under `token`
    ///
    /// The binding must be an `Arc<dyn ConnectionOptionsFactory>`.
    pub fn delegate(token: impl Into<String>) -> Self {
        OptionsSource::Delegate(token.into())
    }

    /// Options from a factory of type `F` built with [`FromContainer`]
    pub fn construct<F>() -> Self
    where
        F: ConnectionOptionsFactory + FromContainer + 'static,
    {
        OptionsSource::Construct(Arc::new(
            |container: &Container| -> DatabaseResult<Arc<dyn ConnectionOptionsFactory>> {
                let factory = F::from_container(container)?;
                Ok(Arc::new(factory) as Arc<dyn ConnectionOptionsFactory>)
            },
        ))
    }

    /// Collapse the source into a single resolver
    ///
    /// `connection_name` is passed to factories so one factory can serve
    /// several connections.
    pub fn into_resolver(self, connection_name: Option<String>) -> OptionsResolver {
        match self {
            OptionsSource::Direct(resolve) => resolve,
            OptionsSource::Delegate(token) => Arc::new(move |container: &Container| {
                let factory = container
                    .resolve::<Arc<dyn ConnectionOptionsFactory>>(&token)
                    .map_err(|e| DatabaseError::OptionsFactory {
                        message: format!("cannot resolve options factory '{}': {}", token, e),
                    });
                let name = connection_name.clone();
                Box::pin(async move { factory?.create_connection_options(name.as_deref()).await })
                    as BoxFuture<'static, DatabaseResult<ConnectionOptions>>
            }),
            OptionsSource::Construct(build) => Arc::new(move |container: &Container| {
                let factory = build(container);
                let name = connection_name.clone();
                Box::pin(async move { factory?.create_connection_options(name.as_deref()).await })
                    as BoxFuture<'static, DatabaseResult<ConnectionOptions>>
            }),
        }
    }
}

impl std::fmt::Debug for OptionsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsSource::Direct(_) => f.write_str("Direct(..)"),
            OptionsSource::Delegate(token) => f.debug_tuple("Delegate").field(token).finish(),
            OptionsSource::Construct(_) => f.write_str("Construct(..)"),
        }
    }
}

/// Root configuration whose options are resolved during boot
pub struct AsyncConnectionOptions {
    /// Logical connection name; the default connection when `None`
    pub name: Option<String>,
    pub source: OptionsSource,
    /// Providers the options source depends on
    pub imports: Vec<Box<dyn ServiceProvider>>,
}

impl AsyncConnectionOptions {
    pub fn new(source: OptionsSource) -> Self {
        Self {
            name: None,
            source,
            imports: Vec::new(),
        }
    }

    /// Options from an async closure
    pub fn from_fn<F, Fut>(resolve: F) -> Self
    where
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DatabaseResult<ConnectionOptions>> + Send + 'static,
    {
        Self::new(OptionsSource::direct(resolve))
    }

    /// Options from a factory bound under `token`
    pub fn from_existing(token: impl Into<String>) -> Self {
        Self::new(OptionsSource::delegate(token))
    }

    /// Options from a factory type built from the container
    pub fn from_factory<F>() -> Self
    where
        F: ConnectionOptionsFactory + FromContainer + 'static,
    {
        Self::new(OptionsSource::construct::<F>())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Register a provider the options source needs
    pub fn with_import<P: ServiceProvider + 'static>(mut self, provider: P) -> Self {
        self.imports.push(Box::new(provider));
        self
    }
}

impl std::fmt::Debug for AsyncConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncConnectionOptions")
            .field("name", &self.name)
            .field("source", &self.source)
            .field(
                "imports",
                &self.imports.iter().map(|provider| provider.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

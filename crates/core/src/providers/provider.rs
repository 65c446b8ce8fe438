use crate::container::Container;
use crate::errors::CoreError;
use async_trait::async_trait;

/// Provider error type
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Circular dependency detected in provider: {provider}")]
    CircularDependency { provider: String },

    #[error("Missing dependency '{dependency}' for provider '{provider}'")]
    MissingDependency {
        provider: String,
        dependency: String,
    },

    #[error("Duplicate provider name: {provider}")]
    DuplicateProvider { provider: String },

    #[error("Provider boot failed: {message}")]
    BootFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Provider shutdown failed: {message}")]
    ShutdownFailed { message: String },

    #[error("Container error: {0}")]
    Container(#[from] CoreError),
}

impl ProviderError {
    /// Create a boot failure
    pub fn boot(message: impl Into<String>) -> Self {
        Self::BootFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a boot failure that keeps the error which caused it
    pub fn boot_caused_by<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BootFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// First error of type `E` in the source chain
    pub fn find_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<E>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }

    /// Create a shutdown failure
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::ShutdownFailed {
            message: message.into(),
        }
    }
}

/// Service provider trait for registering services and managing lifecycle
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Provider name for identification and dependency resolution
    fn name(&self) -> &str;

    /// Bind services whose values are known at composition time
    fn register(&self, container: &Container) -> Result<(), ProviderError> {
        let _ = container;
        Ok(())
    }

    /// Boot the provider after every provider has registered
    async fn boot(&self, container: &Container) -> Result<(), ProviderError> {
        let _ = container;
        Ok(())
    }

    /// Release resources at graceful shutdown
    ///
    /// Called at most once, in reverse boot order. Errors are logged by the
    /// lifecycle manager and never stop the remaining providers from shutting
    /// down.
    async fn shutdown(&self, container: &Container) -> Result<(), ProviderError> {
        let _ = container;
        Ok(())
    }

    /// Provider dependencies (other providers that must be registered first)
    fn dependencies(&self) -> Vec<String> {
        vec![]
    }

    /// Provider description
    fn description(&self) -> Option<&'static str> {
        None
    }
}

/// Provider metadata for introspection
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub name: String,
    pub description: Option<String>,
    pub dependencies: Vec<String>,
}

impl ProviderMetadata {
    /// Create metadata from a provider
    pub fn from_provider<P: ServiceProvider + ?Sized>(provider: &P) -> Self {
        Self {
            name: provider.name().to_string(),
            description: provider.description().map(|d| d.to_string()),
            dependencies: provider.dependencies(),
        }
    }
}

use crate::container::registry::ServiceRegistry;
use crate::errors::CoreError;
use std::sync::Arc;

/// Main dependency injection container
///
/// Services are bound under string tokens. Binding goes through interior
/// locking so providers can publish instances during their async boot phase
/// while holding only a shared reference.
#[derive(Clone, Default)]
pub struct Container {
    registry: ServiceRegistry,
}

impl Container {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an instance under a token, replacing any previous binding
    pub fn bind<T>(&self, token: impl Into<String>, instance: T) -> Result<(), CoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let token = token.into();
        tracing::debug!("Binding service '{}' ({})", token, std::any::type_name::<T>());
        self.registry.insert(token, instance)
    }

    /// Bind an instance under a token that must not be taken yet
    pub fn bind_new<T>(&self, token: impl Into<String>, instance: T) -> Result<(), CoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.registry.insert_new(token, instance)
    }

    /// Bind a shared value, wrapping it in an `Arc`
    pub fn bind_shared<T>(&self, token: impl Into<String>, instance: T) -> Result<(), CoreError>
    where
        T: Send + Sync + 'static,
    {
        self.bind(token, Arc::new(instance))
    }

    /// Resolve a service from the container
    pub fn resolve<T>(&self, token: &str) -> Result<T, CoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.registry.resolve(token)
    }

    /// Try to resolve a service, returning None if not found or of another type
    pub fn try_resolve<T>(&self, token: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.registry.resolve(token).ok()
    }

    /// Remove a binding
    pub fn unbind(&self, token: &str) -> bool {
        self.registry.remove(token)
    }

    /// Check if a service is registered
    pub fn contains(&self, token: &str) -> bool {
        self.registry.contains(token)
    }

    /// Get the number of registered services
    pub fn service_count(&self) -> usize {
        self.registry.service_count()
    }

    /// Get a list of all bound tokens
    pub fn tokens(&self) -> Vec<String> {
        self.registry.tokens()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.service_count())
            .finish()
    }
}

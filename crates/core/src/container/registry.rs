use crate::errors::CoreError;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Service entry in the registry
pub struct ServiceEntry {
    instance: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ServiceEntry {
    fn new<T>(instance: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self {
            instance: Box::new(instance),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Name of the type stored in this entry
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Registry for managing service instances keyed by injection token
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Arc<RwLock<HashMap<String, ServiceEntry>>>,
}

impl ServiceRegistry {
    /// Create a new service registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance under a token, replacing any previous binding
    pub fn insert<T>(&self, token: impl Into<String>, instance: T) -> Result<(), CoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut services = self.services.write().map_err(|_| CoreError::LockError {
            resource: "service_registry".to_string(),
        })?;

        services.insert(token.into(), ServiceEntry::new(instance));
        Ok(())
    }

    /// Register an instance under a token, failing if the token is taken
    pub fn insert_new<T>(&self, token: impl Into<String>, instance: T) -> Result<(), CoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let token = token.into();
        let mut services = self.services.write().map_err(|_| CoreError::LockError {
            resource: "service_registry".to_string(),
        })?;

        if services.contains_key(&token) {
            return Err(CoreError::DuplicateService { token });
        }

        services.insert(token, ServiceEntry::new(instance));
        Ok(())
    }

    /// Resolve a clone of the instance stored under a token
    pub fn resolve<T>(&self, token: &str) -> Result<T, CoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let services = self.services.read().map_err(|_| CoreError::LockError {
            resource: "service_registry".to_string(),
        })?;

        let entry = services
            .get(token)
            .ok_or_else(|| CoreError::service_not_found(token))?;

        entry
            .instance
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| CoreError::ServiceTypeMismatch {
                token: token.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual: entry.type_name.to_string(),
            })
    }

    /// Remove the binding for a token, returning whether one existed
    pub fn remove(&self, token: &str) -> bool {
        self.services
            .write()
            .map(|mut services| services.remove(token).is_some())
            .unwrap_or(false)
    }

    /// Check if a token is bound
    pub fn contains(&self, token: &str) -> bool {
        self.services
            .read()
            .map(|services| services.contains_key(token))
            .unwrap_or(false)
    }

    /// Get the number of registered services
    pub fn service_count(&self) -> usize {
        self.services
            .read()
            .map(|services| services.len())
            .unwrap_or(0)
    }

    /// Get all bound tokens, sorted for stable output
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .services
            .read()
            .map(|services| services.keys().cloned().collect())
            .unwrap_or_default();
        tokens.sort();
        tokens
    }
}

use crate::container::Container;
use crate::providers::{ProviderError, ProviderMetadata, ServiceProvider};
use std::collections::{BTreeSet, HashMap};

/// Provider registry manages service providers and their lifecycle
pub struct ProviderRegistry {
    providers: Vec<Box<dyn ServiceProvider>>,
    order: Vec<usize>,
    metadata_cache: HashMap<String, ProviderMetadata>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            order: Vec::new(),
            metadata_cache: HashMap::new(),
        }
    }

    /// Register a service provider
    pub fn register<P: ServiceProvider + 'static>(&mut self, provider: P) -> Result<(), ProviderError> {
        self.register_boxed(Box::new(provider))
    }

    /// Register an already boxed service provider
    pub fn register_boxed(&mut self, provider: Box<dyn ServiceProvider>) -> Result<(), ProviderError> {
        let metadata = ProviderMetadata::from_provider(provider.as_ref());
        let name = metadata.name.clone();

        if self.metadata_cache.contains_key(&name) {
            return Err(ProviderError::DuplicateProvider { provider: name });
        }

        self.providers.push(provider);
        self.metadata_cache.insert(name, metadata);
        Ok(())
    }

    /// Get the number of registered providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Get provider metadata by name
    pub fn get_metadata(&self, name: &str) -> Option<&ProviderMetadata> {
        self.metadata_cache.get(name)
    }

    /// Provider names in resolved execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&index| self.providers[index].name())
            .collect()
    }

    /// Order providers so each one runs after its dependencies
    ///
    /// Providers without ordering constraints between them keep their
    /// registration order.
    pub fn resolve_dependencies(&mut self) -> Result<(), ProviderError> {
        let index_of: HashMap<&str, usize> = self
            .providers
            .iter()
            .enumerate()
            .map(|(index, provider)| (provider.name(), index))
            .collect();

        let count = self.providers.len();
        let mut pending = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (index, provider) in self.providers.iter().enumerate() {
            for dependency in provider.dependencies() {
                let Some(&target) = index_of.get(dependency.as_str()) else {
                    return Err(ProviderError::MissingDependency {
                        provider: provider.name().to_string(),
                        dependency,
                    });
                };
                pending[index] += 1;
                dependents[target].push(index);
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|&index| pending[index] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(index) = ready.pop_first() {
            order.push(index);
            for &dependent in &dependents[index] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < count {
            let stuck = (0..count).find(|&index| pending[index] > 0).unwrap_or(0);
            return Err(ProviderError::CircularDependency {
                provider: self.providers[stuck].name().to_string(),
            });
        }

        self.order = order;
        Ok(())
    }

    /// Let every provider bind its composition-time services
    pub fn register_all(&self, container: &Container) -> Result<(), ProviderError> {
        for &index in &self.order {
            let provider = &self.providers[index];
            tracing::info!("Registering provider: {}", provider.name());
            provider.register(container)?;
        }
        Ok(())
    }

    /// Boot all providers after registration
    pub async fn boot_all(&self, container: &Container) -> Result<(), ProviderError> {
        for &index in &self.order {
            let provider = &self.providers[index];
            tracing::info!("Booting provider: {}", provider.name());
            provider.boot(container).await.map_err(|e| {
                ProviderError::boot_caused_by(format!("Failed to boot provider '{}': {}", provider.name(), e), e)
            })?;
        }
        Ok(())
    }

    /// Shut providers down in reverse order, logging failures
    ///
    /// Returns the number of providers whose shutdown hook failed.
    pub async fn shutdown_all(&self, container: &Container) -> usize {
        let mut failures = 0;
        for &index in self.order.iter().rev() {
            let provider = &self.providers[index];
            tracing::debug!("Shutting down provider: {}", provider.name());
            if let Err(e) = provider.shutdown(container).await {
                failures += 1;
                tracing::error!("Provider '{}' failed to shut down: {}", provider.name(), e);
            }
        }
        failures
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NamedProvider {
        name: &'static str,
        dependencies: Vec<&'static str>,
    }

    #[async_trait]
    impl ServiceProvider for NamedProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> Vec<String> {
            self.dependencies.iter().map(|d| d.to_string()).collect()
        }
    }

    fn provider(name: &'static str, dependencies: Vec<&'static str>) -> NamedProvider {
        NamedProvider { name, dependencies }
    }

    #[test]
    fn test_dependencies_come_first() {
        let mut registry = ProviderRegistry::new();
        registry.register(provider("repositories", vec!["database"])).unwrap();
        registry.register(provider("database", vec!["config"])).unwrap();
        registry.register(provider("config", vec![])).unwrap();

        registry.resolve_dependencies().unwrap();
        assert_eq!(registry.execution_order(), vec!["config", "database", "repositories"]);
    }

    #[test]
    fn test_independent_providers_keep_registration_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(provider("settings", vec![])).unwrap();
        registry.register(provider("database.root.default", vec!["settings"])).unwrap();
        registry.register(provider("database.feature.default.0", vec![])).unwrap();
        registry.register(provider("database.feature.default.1", vec![])).unwrap();

        registry.resolve_dependencies().unwrap();
        assert_eq!(
            registry.execution_order(),
            vec![
                "settings",
                "database.root.default",
                "database.feature.default.0",
                "database.feature.default.1"
            ]
        );
    }

    #[test]
    fn test_missing_dependency() {
        let mut registry = ProviderRegistry::new();
        registry.register(provider("database", vec!["config"])).unwrap();

        let err = registry.resolve_dependencies().unwrap_err();
        assert!(matches!(err, ProviderError::MissingDependency { .. }));
    }

    #[test]
    fn test_circular_dependency() {
        let mut registry = ProviderRegistry::new();
        registry.register(provider("a", vec!["b"])).unwrap();
        registry.register(provider("b", vec!["a"])).unwrap();

        let err = registry.resolve_dependencies().unwrap_err();
        assert!(matches!(err, ProviderError::CircularDependency { .. }));
    }

    #[test]
    fn test_duplicate_provider_name() {
        let mut registry = ProviderRegistry::new();
        registry.register(provider("database", vec![])).unwrap();

        let err = registry.register(provider("database", vec![])).unwrap_err();
        assert!(matches!(err, ProviderError::DuplicateProvider { .. }));
        assert_eq!(registry.provider_count(), 1);
        assert!(registry.get_metadata("database").is_some());
    }
}

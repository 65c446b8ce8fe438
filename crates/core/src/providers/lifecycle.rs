use crate::container::Container;
use crate::foundation::{LifecycleManager, LifecycleState};
use crate::providers::{ProviderError, ProviderRegistry, ServiceProvider};
use std::time::{Duration, Instant};

/// Provider lifecycle manager
///
/// Drives registration, boot and shutdown of every registered provider
/// against a single container.
pub struct ProviderLifecycleManager {
    registry: ProviderRegistry,
    container: Container,
    lifecycle: LifecycleManager,
    lifecycle_stats: ProviderLifecycleStats,
}

impl ProviderLifecycleManager {
    /// Create a new provider lifecycle manager
    pub fn new() -> Self {
        Self::with_container(Container::new())
    }

    /// Create a manager that binds into an existing container
    pub fn with_container(container: Container) -> Self {
        Self {
            registry: ProviderRegistry::new(),
            container,
            lifecycle: LifecycleManager::new(),
            lifecycle_stats: ProviderLifecycleStats::new(),
        }
    }

    /// Register a provider
    pub fn register<P: ServiceProvider + 'static>(&mut self, provider: P) -> Result<(), ProviderError> {
        self.registry.register(provider)
    }

    /// Register an already boxed provider
    pub fn register_boxed(&mut self, provider: Box<dyn ServiceProvider>) -> Result<(), ProviderError> {
        self.registry.register_boxed(provider)
    }

    /// Execute the register and boot phases and return the populated container
    pub async fn execute_lifecycle(&mut self) -> Result<Container, ProviderError> {
        let start_time = Instant::now();
        self.lifecycle.transition(LifecycleState::Initializing);

        tracing::info!("Starting provider lifecycle execution...");

        match self.run_phases().await {
            Ok(()) => {
                self.lifecycle_stats.total_time = start_time.elapsed();
                self.lifecycle_stats.provider_count = self.registry.provider_count();
                self.lifecycle.transition(LifecycleState::Running);

                tracing::info!(
                    "Provider lifecycle completed successfully in {:?} with {} providers",
                    self.lifecycle_stats.total_time,
                    self.lifecycle_stats.provider_count
                );

                Ok(self.container.clone())
            }
            Err(e) => {
                self.lifecycle.transition(LifecycleState::Failed);
                tracing::error!("Provider lifecycle failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self) -> Result<(), ProviderError> {
        let dep_start = Instant::now();
        self.registry.resolve_dependencies()?;
        self.lifecycle_stats.dependency_resolution_time = dep_start.elapsed();

        let reg_start = Instant::now();
        self.registry.register_all(&self.container)?;
        self.lifecycle_stats.registration_time = reg_start.elapsed();

        let boot_start = Instant::now();
        self.registry.boot_all(&self.container).await?;
        self.lifecycle_stats.boot_time = boot_start.elapsed();

        Ok(())
    }

    /// Run every provider's shutdown hook once
    ///
    /// Later calls are no-ops. Returns false when nothing was shut down.
    pub async fn shutdown(&mut self) -> bool {
        if !self
            .lifecycle
            .transition_from(LifecycleState::Running, LifecycleState::Stopping)
        {
            tracing::debug!("Shutdown skipped in state {:?}", self.lifecycle.state());
            return false;
        }

        let start = Instant::now();
        let failures = self.registry.shutdown_all(&self.container).await;
        self.lifecycle_stats.shutdown_time = start.elapsed();
        self.lifecycle.transition(LifecycleState::Stopped);

        if failures > 0 {
            tracing::warn!("Shutdown completed with {} provider failure(s)", failures);
        } else {
            tracing::info!("Shutdown completed in {:?}", self.lifecycle_stats.shutdown_time);
        }
        true
    }

    /// Wait for Ctrl+C, then shut down
    pub async fn shutdown_on_signal(&mut self) -> Result<(), ProviderError> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| ProviderError::shutdown(format!("Failed to listen for shutdown signal: {}", e)))?;
        tracing::info!("Shutdown signal received");
        self.shutdown().await;
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// The container providers bind into
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Get lifecycle statistics
    pub fn lifecycle_stats(&self) -> &ProviderLifecycleStats {
        &self.lifecycle_stats
    }

    /// Get provider registry
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

impl Default for ProviderLifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for provider lifecycle execution
#[derive(Debug, Clone, Default)]
pub struct ProviderLifecycleStats {
    pub provider_count: usize,
    pub total_time: Duration,
    pub dependency_resolution_time: Duration,
    pub registration_time: Duration,
    pub boot_time: Duration,
    pub shutdown_time: Duration,
}

impl ProviderLifecycleStats {
    /// Create new lifecycle stats
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingProvider {
        name: &'static str,
        dependencies: Vec<String>,
        log: Arc<std::sync::Mutex<Vec<String>>>,
        fail_shutdown: bool,
        shutdowns: Arc<AtomicUsize>,
    }

    impl RecordingProvider {
        fn new(name: &'static str, log: Arc<std::sync::Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                dependencies: vec![],
                log,
                fail_shutdown: false,
                shutdowns: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ServiceProvider for RecordingProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> Vec<String> {
            self.dependencies.clone()
        }

        fn register(&self, container: &Container) -> Result<(), ProviderError> {
            container.bind(self.name, self.name.to_string())?;
            Ok(())
        }

        async fn boot(&self, _container: &Container) -> Result<(), ProviderError> {
            self.log.lock().unwrap().push(format!("boot:{}", self.name));
            Ok(())
        }

        async fn shutdown(&self, _container: &Container) -> Result<(), ProviderError> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("shutdown:{}", self.name));
            if self.fail_shutdown {
                return Err(ProviderError::shutdown("close failed"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle_order() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut manager = ProviderLifecycleManager::new();

        let mut repositories = RecordingProvider::new("repositories", log.clone());
        repositories.dependencies = vec!["database".to_string()];
        manager.register(repositories).unwrap();
        manager.register(RecordingProvider::new("database", log.clone())).unwrap();

        let container = manager.execute_lifecycle().await.unwrap();
        assert!(container.contains("database"));
        assert!(container.contains("repositories"));
        assert_eq!(manager.state(), LifecycleState::Running);
        assert_eq!(manager.lifecycle_stats().provider_count, 2);

        assert!(manager.shutdown().await);
        assert_eq!(manager.state(), LifecycleState::Stopped);

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "boot:database",
                "boot:repositories",
                "shutdown:repositories",
                "shutdown:database",
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_runs_once_and_survives_failures() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut manager = ProviderLifecycleManager::new();

        let mut failing = RecordingProvider::new("failing", log.clone());
        failing.fail_shutdown = true;
        let failing_count = failing.shutdowns.clone();
        let healthy = RecordingProvider::new("healthy", log.clone());
        let healthy_count = healthy.shutdowns.clone();

        manager.register(healthy).unwrap();
        manager.register(failing).unwrap();
        manager.execute_lifecycle().await.unwrap();

        assert!(manager.shutdown().await);
        assert!(!manager.shutdown().await);

        assert_eq!(failing_count.load(Ordering::SeqCst), 1);
        assert_eq!(healthy_count.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_failed_lifecycle_skips_shutdown() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut manager = ProviderLifecycleManager::new();

        let mut orphan = RecordingProvider::new("orphan", log.clone());
        orphan.dependencies = vec!["missing".to_string()];
        manager.register(orphan).unwrap();

        assert!(manager.execute_lifecycle().await.is_err());
        assert_eq!(manager.state(), LifecycleState::Failed);
        assert!(!manager.shutdown().await);
    }
}

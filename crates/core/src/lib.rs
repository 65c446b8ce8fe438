//! # elif-core
//!
//! Host contract for elif.rs integrations: a token-keyed service container,
//! service providers with register/boot/shutdown hooks, and environment
//! configuration helpers.

pub mod config;
pub mod container;
pub mod errors;
pub mod foundation;
pub mod providers;

pub use config::{AppConfigTrait, ConfigError, ConfigSource};
pub use container::{Container, ServiceRegistry};
pub use errors::CoreError;
pub use foundation::{LifecycleManager, LifecycleState};
pub use providers::{
    ProviderError, ProviderLifecycleManager, ProviderMetadata, ProviderRegistry, ServiceProvider,
};

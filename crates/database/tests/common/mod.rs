//! Shared fixtures for integration tests

#![allow(dead_code)]

use elif_database::{ConnectionBootstrapper, ConnectionManager, Entity, EntityRegistry, MemoryConnectionFactory};
use std::sync::Arc;

pub use elif_database::testing::WarnCapture;

macro_rules! test_entity {
    ($name:ident, $table:expr) => {
        pub struct $name;

        impl Entity for $name {
            fn entity_name() -> &'static str {
                stringify!($name)
            }

            fn table_name() -> &'static str {
                $table
            }
        }
    };
}

test_entity!(User, "users");
test_entity!(Post, "posts");
test_entity!(Comment, "comments");
test_entity!(Tag, "tags");
test_entity!(AuditLog, "audit_logs");

/// Bootstrapper over fresh state and a shared memory factory
pub fn bootstrapper(factory: MemoryConnectionFactory) -> (ConnectionBootstrapper, Arc<MemoryConnectionFactory>) {
    let factory = Arc::new(factory);
    let bootstrapper = ConnectionBootstrapper::new(Arc::new(EntityRegistry::new()), Arc::new(ConnectionManager::new()))
        .with_factory(factory.clone());
    (bootstrapper, factory)
}

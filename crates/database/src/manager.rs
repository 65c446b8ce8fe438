//! Connections by logical name

use crate::connection::Connection;
use dashmap::DashMap;
use std::sync::Arc;

/// Live connections keyed by logical name
///
/// The bootstrapper records every connection it creates here; keep-alive
/// reuse and repository resolution look connections up by name.
#[derive(Default)]
pub struct ConnectionManager {
    connections: DashMap<String, Arc<dyn Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection registered under `name`, initialized or not
    pub fn get(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.connections.get(name).map(|entry| entry.value().clone())
    }

    /// Connection registered under `name` if it is still usable
    pub fn get_initialized(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.get(name).filter(|connection| connection.is_initialized())
    }

    /// Record a connection, returning the one it replaces
    pub fn insert(&self, name: impl Into<String>, connection: Arc<dyn Connection>) -> Option<Arc<dyn Connection>> {
        self.connections.insert(name.into(), connection)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.connections.remove(name).map(|(_, connection)| connection)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every connection and clear the manager
    ///
    /// Close failures are logged. Returns how many connections closed cleanly.
    pub async fn close_all(&self) -> usize {
        let names = self.names();
        let mut closed = 0;

        for name in names {
            if let Some(connection) = self.remove(&name) {
                match connection.close().await {
                    Ok(()) => closed += 1,
                    Err(e) => tracing::error!("Failed to close connection '{}': {}", name, e),
                }
            }
        }

        closed
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.names())
            .finish()
    }
}

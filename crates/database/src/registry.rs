//! Entity registry
//!
//! Accumulates the entities that feature modules register against each
//! logical connection so auto-loading connections can pick them up at
//! bootstrap time. The registry is an explicit object: create one, share it
//! through an `Arc`, and hand it to every feature registration and to the
//! bootstrapper.

use crate::entity::{extend_unique, EntityDescriptor};
use crate::options::{ConnectionOptions, DEFAULT_CONNECTION_NAME};
use dashmap::DashMap;

/// Identifies the logical connection an entity registration targets
#[derive(Debug, Clone)]
pub enum ConnectionKey {
    /// The default connection
    Default,
    /// A connection by logical name
    Name(String),
    /// The connection those options describe
    Options(Box<ConnectionOptions>),
}

impl ConnectionKey {
    /// Resolve the logical connection name
    ///
    /// Options resolve through [`ConnectionOptions::connection_name`], the
    /// same function the bootstrapper uses, so both sides agree on identity.
    pub fn resolve(&self) -> String {
        match self {
            ConnectionKey::Default => DEFAULT_CONNECTION_NAME.to_string(),
            ConnectionKey::Name(name) => name.clone(),
            ConnectionKey::Options(options) => options.connection_name(),
        }
    }
}

impl Default for ConnectionKey {
    fn default() -> Self {
        ConnectionKey::Default
    }
}

impl From<&str> for ConnectionKey {
    fn from(name: &str) -> Self {
        ConnectionKey::Name(name.to_string())
    }
}

impl From<String> for ConnectionKey {
    fn from(name: String) -> Self {
        ConnectionKey::Name(name)
    }
}

impl From<Option<&str>> for ConnectionKey {
    fn from(name: Option<&str>) -> Self {
        name.map(ConnectionKey::from).unwrap_or_default()
    }
}

impl From<ConnectionOptions> for ConnectionKey {
    fn from(options: ConnectionOptions) -> Self {
        ConnectionKey::Options(Box::new(options))
    }
}

impl From<&ConnectionOptions> for ConnectionKey {
    fn from(options: &ConnectionOptions) -> Self {
        ConnectionKey::Options(Box::new(options.clone()))
    }
}

/// Append-only table of entities per logical connection
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: DashMap<String, Vec<EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entities to the connection's list
    ///
    /// Entities already registered for the connection are skipped, so the
    /// list keeps first-registration order.
    pub fn register<K, I>(&self, key: K, entities: I)
    where
        K: Into<ConnectionKey>,
        I: IntoIterator<Item = EntityDescriptor>,
    {
        let name = key.into().resolve();
        let mut entry = self.entries.entry(name.clone()).or_default();
        let before = entry.len();
        extend_unique(&mut entry, entities);

        tracing::debug!(
            "Registered {} entit(y/ies) for connection '{}' ({} total)",
            entry.len() - before,
            name,
            entry.len()
        );
    }

    /// Entities registered for a connection, empty when none were
    pub fn lookup<K: Into<ConnectionKey>>(&self, key: K) -> Vec<EntityDescriptor> {
        let name = key.into().resolve();
        self.entries
            .get(&name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Connection names with at least one registration, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of connections with registrations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

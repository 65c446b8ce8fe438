//! Connection options
//!
//! Driver coordinates, pool settings and the integration fields that control
//! naming, retries, entity auto-loading and keep-alive.

use crate::entity::{EntityDescriptor, EntitySource};
use crate::error::{DatabaseError, DatabaseResult};
use elif_core::config::{env_flag, env_var};
use elif_core::{AppConfigTrait, ConfigError, ConfigSource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Logical name used when a single connection is configured
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// Default number of connection attempts
pub const DEFAULT_RETRY_ATTEMPTS: i32 = 10;

/// Default delay between connection attempts, in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 3000;

/// Decides whether a failed connection attempt should be retried
pub type RetryPredicate = Arc<dyn Fn(&DatabaseError) -> bool + Send + Sync>;

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverType {
    #[serde(rename = "postgres", alias = "postgresql")]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "sqlite")]
    Sqlite,
    #[serde(rename = "mongodb")]
    MongoDb,
}

/// Storage model of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverFamily {
    /// Tables and SQL
    Relational,
    /// Schemaless documents and collections
    Document,
}

impl DriverType {
    /// Get the driver name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverType::Postgres => "postgres",
            DriverType::MySql => "mysql",
            DriverType::Sqlite => "sqlite",
            DriverType::MongoDb => "mongodb",
        }
    }

    /// Storage model of this driver
    pub fn family(&self) -> DriverFamily {
        match self {
            DriverType::MongoDb => DriverFamily::Document,
            _ => DriverFamily::Relational,
        }
    }

    /// Port used when none is configured
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DriverType::Postgres => Some(5432),
            DriverType::MySql => Some(3306),
            DriverType::MongoDb => Some(27017),
            DriverType::Sqlite => None,
        }
    }

    /// Infer the driver from a connection URL scheme
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split("://").next()?;
        scheme.parse().ok()
    }
}

impl FromStr for DriverType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DriverType::Postgres),
            "mysql" | "mariadb" => Ok(DriverType::MySql),
            "sqlite" => Ok(DriverType::Sqlite),
            "mongodb" | "mongo" | "mongodb+srv" => Ok(DriverType::MongoDb),
            _ => Err(ConfigError::invalid_value(
                "driver",
                s,
                "postgres, mysql, sqlite, or mongodb",
            )),
        }
    }
}

impl std::fmt::Display for DriverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout: u64,
    pub idle_timeout: Option<u64>,
    pub max_lifetime: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: 30,
            idle_timeout: Some(600),  // 10 minutes
            max_lifetime: Some(1800), // 30 minutes
            test_before_acquire: true,
        }
    }
}

/// Options for creating a database connection
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Logical connection name; `None` derives a name from the options themselves
    pub name: Option<String>,
    /// `None` lets the connection factory resolve everything from the environment
    pub driver: Option<DriverType>,
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: Option<String>,
    #[serde(skip_deserializing)]
    pub entities: EntitySource,
    pub pool: PoolConfig,
    /// Total connection attempts; zero or negative disables retrying
    pub retry_attempts: i32,
    pub retry_delay_ms: u64,
    #[serde(skip)]
    pub retry_predicate: Option<RetryPredicate>,
    /// Merge entities registered for this connection into `entities`
    pub auto_load_entities: bool,
    /// Leave the connection open at shutdown and reuse it when bootstrapped again
    pub keep_connection_alive: bool,
    /// Include error messages in retry warnings
    pub verbose_retry_log: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            name: Some(DEFAULT_CONNECTION_NAME.to_string()),
            driver: None,
            url: None,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            entities: EntitySource::default(),
            pool: PoolConfig::default(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            retry_predicate: None,
            auto_load_entities: false,
            keep_connection_alive: false,
            verbose_retry_log: false,
        }
    }
}

impl ConnectionOptions {
    /// Create options for a driver
    pub fn new(driver: DriverType) -> Self {
        Self {
            driver: Some(driver),
            ..Self::default()
        }
    }

    /// Create options from a connection URL, inferring the driver from its scheme
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            driver: DriverType::from_url(&url),
            url: Some(url),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Drop the explicit name so the logical name is derived from the options
    pub fn without_name(mut self) -> Self {
        self.name = None;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_entities(mut self, entities: Vec<EntityDescriptor>) -> Self {
        self.entities = EntitySource::List(entities);
        self
    }

    pub fn with_entity_map(mut self, entities: BTreeMap<String, EntityDescriptor>) -> Self {
        self.entities = EntitySource::Map(entities);
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: i32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Only retry failures for which `predicate` returns true
    pub fn with_retry_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&DatabaseError) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn with_auto_load_entities(mut self, enabled: bool) -> Self {
        self.auto_load_entities = enabled;
        self
    }

    pub fn with_keep_connection_alive(mut self, enabled: bool) -> Self {
        self.keep_connection_alive = enabled;
        self
    }

    pub fn with_verbose_retry_log(mut self, enabled: bool) -> Self {
        self.verbose_retry_log = enabled;
        self
    }

    /// Delay between connection attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether a failure should be retried according to the configured predicate
    pub fn should_retry(&self, error: &DatabaseError) -> bool {
        self.retry_predicate
            .as_ref()
            .map(|predicate| predicate(error))
            .unwrap_or(true)
    }

    /// Logical connection name
    ///
    /// The explicit name when one is set, otherwise a canonical serialization
    /// of the options (object keys sorted, passwords excluded) so equal options
    /// always resolve to the same name.
    pub fn connection_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.canonical_key(),
        }
    }

    fn canonical_key(&self) -> String {
        match serde_json::to_value(self) {
            Ok(mut value) => {
                if let Some(object) = value.as_object_mut() {
                    object.remove("name");
                    if let Some(url) = self.url.as_deref() {
                        object.insert("url".to_string(), strip_password(url).into());
                    }
                }
                canonical_json(&value)
            }
            // Serialization of these fields cannot fail in practice
            Err(_) => DEFAULT_CONNECTION_NAME.to_string(),
        }
    }

    /// Connection URL, built from the discrete fields when no URL is set
    pub fn connection_url(&self) -> DatabaseResult<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let driver = self.driver.ok_or_else(|| {
            DatabaseError::configuration("Cannot build a connection URL without a driver")
        })?;

        if driver == DriverType::Sqlite {
            let path = self.database.as_deref().unwrap_or(":memory:");
            return Ok(format!("sqlite://{}", path));
        }

        let host = self.host.as_deref().unwrap_or("localhost");
        let mut url = url::Url::parse(&format!("{}://{}", driver.as_str(), host))
            .map_err(|e| DatabaseError::configuration(format!("Invalid database host '{}': {}", host, e)))?;

        let invalid = |field: &str| DatabaseError::configuration(format!("Cannot set {} on connection URL", field));
        if let Some(username) = &self.username {
            url.set_username(username).map_err(|_| invalid("username"))?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password)).map_err(|_| invalid("password"))?;
        }
        url.set_port(self.port.or_else(|| driver.default_port()))
            .map_err(|_| invalid("port"))?;
        if let Some(database) = &self.database {
            url.set_path(&format!("/{}", database.trim_start_matches('/')));
        }

        Ok(url.to_string())
    }

    /// Connection URL with the password masked, for logs
    pub fn redacted_url(&self) -> String {
        match self.connection_url() {
            Ok(raw) => redact_url(&raw),
            Err(_) => "<unconfigured>".to_string(),
        }
    }

    /// Load options from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut options: ConnectionOptions = serde_yaml::from_str(yaml)?;
        if options.driver.is_none() {
            options.driver = options.url.as_deref().and_then(DriverType::from_url);
        }
        Ok(options)
    }

    /// Load options from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

/// Mask the password component of a connection URL
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => raw.split('@').last().unwrap_or("unknown").to_string(),
    }
}

/// Connection URL without its password, for identity keys
fn strip_password(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            let _ = url.set_password(None);
            url.to_string()
        }
        Err(_) => match raw.rsplit_once('@') {
            Some((credentials, host)) => {
                let user = credentials.split(':').next().unwrap_or_default();
                format!("{}@{}", user, host)
            }
            None => raw.to_string(),
        },
    }
}

fn canonical_json(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        Value::String(key.clone()),
                        canonical_json(&map[key.as_str()])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

impl std::fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .field("url", &self.url.as_deref().map(redact_url))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("database", &self.database)
            .field("entities", &self.entities.len())
            .field("pool", &self.pool)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("retry_predicate", &self.retry_predicate.is_some())
            .field("auto_load_entities", &self.auto_load_entities)
            .field("keep_connection_alive", &self.keep_connection_alive)
            .field("verbose_retry_log", &self.verbose_retry_log)
            .finish()
    }
}

const ENV_KEYS: &[(&str, &str)] = &[
    ("name", "DATABASE_CONNECTION_NAME"),
    ("driver", "DATABASE_DRIVER"),
    ("url", "DATABASE_URL"),
    ("retry_attempts", "DATABASE_RETRY_ATTEMPTS"),
    ("retry_delay_ms", "DATABASE_RETRY_DELAY_MS"),
    ("auto_load_entities", "DATABASE_AUTO_LOAD_ENTITIES"),
    ("keep_connection_alive", "DATABASE_KEEP_ALIVE"),
    ("verbose_retry_log", "DATABASE_VERBOSE_RETRY"),
    ("pool.max_connections", "DATABASE_MAX_CONNECTIONS"),
    ("pool.min_connections", "DATABASE_MIN_CONNECTIONS"),
];

impl AppConfigTrait for ConnectionOptions {
    fn from_env() -> Result<Self, ConfigError> {
        let mut options = Self::default();

        if let Some(name) = env_var::<String>("DATABASE_CONNECTION_NAME", "connection name")? {
            options.name = Some(name);
        }

        options.url = env_var::<String>("DATABASE_URL", "database URL")?;

        // An explicit driver wins over the URL scheme
        options.driver = match env_var::<DriverType>("DATABASE_DRIVER", "postgres, mysql, sqlite, or mongodb")? {
            Some(driver) => Some(driver),
            None => options.url.as_deref().and_then(DriverType::from_url),
        };

        if let Some(attempts) = env_var("DATABASE_RETRY_ATTEMPTS", "integer number of attempts")? {
            options.retry_attempts = attempts;
        }
        if let Some(delay) = env_var("DATABASE_RETRY_DELAY_MS", "delay in milliseconds")? {
            options.retry_delay_ms = delay;
        }
        if let Some(enabled) = env_flag("DATABASE_AUTO_LOAD_ENTITIES")? {
            options.auto_load_entities = enabled;
        }
        if let Some(enabled) = env_flag("DATABASE_KEEP_ALIVE")? {
            options.keep_connection_alive = enabled;
        }
        if let Some(enabled) = env_flag("DATABASE_VERBOSE_RETRY")? {
            options.verbose_retry_log = enabled;
        }
        if let Some(max) = env_var("DATABASE_MAX_CONNECTIONS", "positive integer")? {
            options.pool.max_connections = max;
        }
        if let Some(min) = env_var("DATABASE_MIN_CONNECTIONS", "non-negative integer")? {
            options.pool.min_connections = min;
        }

        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.max_connections == 0 {
            return Err(ConfigError::invalid_value(
                "pool.max_connections",
                "0",
                "at least 1 connection",
            ));
        }

        if self.pool.min_connections > self.pool.max_connections {
            return Err(ConfigError::validation_failed(format!(
                "pool.min_connections ({}) exceeds pool.max_connections ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }

        if let Some(driver) = self.driver {
            let has_coordinates = self.url.is_some() || self.host.is_some() || self.database.is_some();
            if !has_coordinates {
                return Err(ConfigError::missing_required(
                    "url",
                    format!("A {} connection needs a URL, host or database", driver),
                ));
            }
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        ENV_KEYS
            .iter()
            .map(|(field, key)| (field.to_string(), ConfigSource::from_env_key(field, key)))
            .collect()
    }
}

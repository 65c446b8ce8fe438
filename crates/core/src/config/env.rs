use super::ConfigError;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Origin of a configuration value, reported by [`AppConfigTrait::config_sources`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from the named environment variable
    EnvVar(String),
    /// Built-in default for the named field
    Default(String),
    /// Read from a configuration file at this path
    File(String),
    /// Set in code
    Programmatic,
}

impl ConfigSource {
    pub fn is_env_var(&self) -> bool {
        matches!(self, ConfigSource::EnvVar(_))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ConfigSource::Default(_))
    }

    /// Source of `field`: `key` when that variable is set, the default otherwise
    pub fn from_env_key(field: &str, key: &str) -> Self {
        if env::var_os(key).is_some() {
            ConfigSource::EnvVar(key.to_string())
        } else {
            ConfigSource::Default(field.to_string())
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::EnvVar(key) => write!(f, "env {}", key),
            ConfigSource::Default(field) => write!(f, "default for {}", field),
            ConfigSource::File(path) => write!(f, "file {}", path),
            ConfigSource::Programmatic => f.write_str("code"),
        }
    }
}

/// Configuration trait for components configured from the environment
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Read and parse an optional environment variable
///
/// Returns `Ok(None)` when the variable is unset and an `InvalidValue` error
/// naming `expected` when it is set but does not parse.
pub fn env_var<T: FromStr>(key: &str, expected: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid_value(key, raw, expected)),
        Err(_) => Ok(None),
    }
}

/// Read an optional boolean flag, accepting `1/0`, `yes/no` and `on/off`
pub fn env_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::invalid_value(key, raw, "boolean (true/false)")),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_var_parsing() {
        env::set_var("ELIF_TEST_PORT", "5432");
        assert_eq!(env_var::<u16>("ELIF_TEST_PORT", "port").unwrap(), Some(5432));

        env::set_var("ELIF_TEST_PORT", "not-a-port");
        let err = env_var::<u16>("ELIF_TEST_PORT", "port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        env::remove_var("ELIF_TEST_PORT");
        assert_eq!(env_var::<u16>("ELIF_TEST_PORT", "port").unwrap(), None);
    }

    #[test]
    #[serial]
    fn test_source_from_env_key() {
        env::set_var("ELIF_TEST_HOST", "db");
        assert_eq!(
            ConfigSource::from_env_key("host", "ELIF_TEST_HOST"),
            ConfigSource::EnvVar("ELIF_TEST_HOST".to_string())
        );

        env::remove_var("ELIF_TEST_HOST");
        let source = ConfigSource::from_env_key("host", "ELIF_TEST_HOST");
        assert!(source.is_default());
        assert_eq!(source.to_string(), "default for host");
    }

    #[test]
    #[serial]
    fn test_env_flag_parsing() {
        env::set_var("ELIF_TEST_FLAG", "Yes");
        assert_eq!(env_flag("ELIF_TEST_FLAG").unwrap(), Some(true));

        env::set_var("ELIF_TEST_FLAG", "off");
        assert_eq!(env_flag("ELIF_TEST_FLAG").unwrap(), Some(false));

        env::set_var("ELIF_TEST_FLAG", "maybe");
        assert!(env_flag("ELIF_TEST_FLAG").is_err());

        env::remove_var("ELIF_TEST_FLAG");
        assert_eq!(env_flag("ELIF_TEST_FLAG").unwrap(), None);
    }
}

//! Error types for connection bootstrap and repository resolution

use elif_core::{ConfigError, CoreError, ProviderError};

/// Result type alias for database integration operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Error types for connection bootstrap, registration and repository lookup
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection '{connection}' failed: {message}")]
    Connection { connection: String, message: String },

    #[error("Authentication failed for connection '{connection}': {message}")]
    Authentication { connection: String, message: String },

    #[error("Unsupported driver '{driver}': {message}")]
    UnsupportedDriver { driver: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection '{connection}' is not initialized")]
    ConnectionNotInitialized { connection: String },

    #[error("No repository for entity '{entity}' on connection '{connection}'")]
    RepositoryNotFound { entity: String, connection: String },

    #[error("Connection options factory failed: {message}")]
    OptionsFactory { message: String },

    #[error("Database driver error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DatabaseError {
    /// Create a connection failure
    pub fn connection(connection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            connection: connection.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the failure was caused by rejected credentials
    ///
    /// Covers explicit `Authentication` errors and PostgreSQL SQLSTATE class 28
    /// (`invalid_authorization_specification`, `invalid_password`). Useful as a
    /// building block for retry predicates, since retrying bad credentials only
    /// delays the inevitable.
    pub fn is_authentication(&self) -> bool {
        match self {
            DatabaseError::Authentication { .. } => true,
            DatabaseError::Sqlx(sqlx::Error::Database(db_err)) => db_err
                .code()
                .map(|code| code.starts_with("28"))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Whether the failure is a configuration problem no retry can fix
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DatabaseError::Configuration { .. }
                | DatabaseError::Config(_)
                | DatabaseError::UnsupportedDriver { .. }
        )
    }
}

impl From<DatabaseError> for ProviderError {
    fn from(err: DatabaseError) -> Self {
        ProviderError::boot_caused_by(err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatabaseError::connection("analytics", "connection refused");
        assert_eq!(err.to_string(), "Connection 'analytics' failed: connection refused");

        let err = DatabaseError::RepositoryNotFound {
            entity: "User".to_string(),
            connection: "default".to_string(),
        };
        assert!(err.to_string().contains("User"));
    }

    #[test]
    fn test_classification() {
        let auth = DatabaseError::Authentication {
            connection: "default".to_string(),
            message: "password authentication failed".to_string(),
        };
        assert!(auth.is_authentication());
        assert!(!auth.is_configuration());

        assert!(DatabaseError::configuration("missing url").is_configuration());
        assert!(!DatabaseError::Sqlx(sqlx::Error::PoolTimedOut).is_authentication());
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: ProviderError = DatabaseError::connection("default", "refused").into();
        assert!(matches!(err, ProviderError::BootFailed { .. }));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_provider_error_keeps_classification() {
        let err: ProviderError = DatabaseError::Authentication {
            connection: "default".to_string(),
            message: "password authentication failed".to_string(),
        }
        .into();

        let cause = err.find_source::<DatabaseError>().unwrap();
        assert!(cause.is_authentication());
    }
}

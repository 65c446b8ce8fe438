use thiserror::Error;

/// Errors raised by the service container
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Service not found for token: {token}")]
    ServiceNotFound { token: String },

    #[error("Service '{token}' is registered as '{actual}', not '{expected}'")]
    ServiceTypeMismatch {
        token: String,
        expected: String,
        actual: String,
    },

    #[error("Service already registered for token: {token}")]
    DuplicateService { token: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },
}

impl CoreError {
    pub fn service_not_found(token: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            token: token.into(),
        }
    }

    /// Token the error is about, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::ServiceNotFound { token }
            | Self::ServiceTypeMismatch { token, .. }
            | Self::DuplicateService { token } => Some(token),
            Self::LockError { .. } => None,
        }
    }

    pub fn is_service_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_service() {
        let missing = CoreError::service_not_found("DatabaseConnection");
        assert!(missing.is_service_not_found());
        assert_eq!(missing.token(), Some("DatabaseConnection"));
        assert_eq!(
            missing.to_string(),
            "Service not found for token: DatabaseConnection"
        );
    }

    #[test]
    fn test_lock_error_has_no_token() {
        let err = CoreError::LockError {
            resource: "service registry".to_string(),
        };
        assert!(err.token().is_none());
        assert!(!err.is_service_not_found());
    }
}

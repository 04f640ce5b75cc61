use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failures of the attempt store or the counter store.
///
/// None of these may be read as "no attempts recorded"; the guard applies its
/// configured [`FailurePolicy`](crate::config::FailurePolicy) instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Migration error: {0}")]
    Migration(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Identity is empty")]
    InvalidIdentity,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification queue is closed")]
    QueueClosed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl Error {
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Store(StoreError::Timeout(_)))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_dispatch_error(&self) -> bool {
        matches!(self, Error::Dispatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let store_error = Error::Store(StoreError::Unavailable("connection refused".to_string()));
        assert_eq!(
            store_error.to_string(),
            "Storage error: Store unavailable: connection refused"
        );

        let validation_error = Error::Validation(ValidationError::InvalidIdentity);
        assert_eq!(
            validation_error.to_string(),
            "Validation error: Identity is empty"
        );

        let timeout = Error::Store(StoreError::Timeout(Duration::from_millis(250)));
        assert_eq!(
            timeout.to_string(),
            "Storage error: Store did not respond within 250ms"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert!(Error::Store(StoreError::Database("locked".into())).is_store_error());
        assert!(Error::Store(StoreError::Timeout(Duration::from_secs(1))).is_timeout());
        assert!(!Error::Store(StoreError::Database("locked".into())).is_timeout());
        assert!(Error::Validation(ValidationError::InvalidIdentity).is_validation_error());
        assert!(Error::Dispatch(DispatchError::QueueClosed).is_dispatch_error());
        assert!(!Error::Dispatch(DispatchError::QueueClosed).is_store_error());
    }

    #[test]
    fn test_from_conversions() {
        let error: Error = StoreError::Unavailable("down".into()).into();
        assert!(error.is_store_error());

        let error: Error = ConfigError::InvalidValue {
            key: "BASTION_MAX_FAILED_ATTEMPTS".into(),
            value: "zero".into(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid value for BASTION_MAX_FAILED_ATTEMPTS: zero"
        );
    }
}

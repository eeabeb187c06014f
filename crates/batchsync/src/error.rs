use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors returned by [`BatchSyncEngine`](crate::BatchSyncEngine) operations.
///
/// Per-account failures never surface here; they are captured into the
/// run's [`AccountSyncResult`](crate::sync::AccountSyncResult)s.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No configuration with this id.
    #[error("Configuration not found: {id}")]
    NotFound { id: Uuid },

    /// The configuration already has an active run.
    #[error("Configuration {id} is already running")]
    AlreadyRunning { id: Uuid },

    /// The configuration is disabled and the caller did not force it.
    #[error("Configuration {id} is disabled")]
    Disabled { id: Uuid },

    /// Cancel was requested but nothing is running.
    #[error("Configuration {id} is not running")]
    NotRunning { id: Uuid },

    /// A create or update request failed validation.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The strategy task failed outside account-level error handling.
    #[error("Strategy failed: {message}")]
    Strategy { message: String },

    /// Missing required field in builder.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// Loading configurations from the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Create an invalid configuration error.
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a strategy failure error.
    #[inline]
    pub fn strategy(message: impl Into<String>) -> Self {
        Self::Strategy {
            message: message.into(),
        }
    }

    /// Whether this error is a conflict with a run in progress.
    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. } | Self::NotRunning { .. })
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_config() {
        let id = Uuid::nil();
        assert_eq!(
            EngineError::NotFound { id }.to_string(),
            format!("Configuration not found: {}", id)
        );
        assert!(EngineError::Disabled { id }.to_string().contains("disabled"));
        assert_eq!(
            EngineError::invalid("name must not be empty").to_string(),
            "Invalid configuration: name must not be empty"
        );
    }

    #[test]
    fn test_is_conflict() {
        let id = Uuid::new_v4();
        assert!(EngineError::AlreadyRunning { id }.is_conflict());
        assert!(EngineError::NotRunning { id }.is_conflict());
        assert!(!EngineError::NotFound { id }.is_conflict());
        assert!(!EngineError::strategy("boom").is_conflict());
    }
}

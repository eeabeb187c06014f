use thiserror::Error;

/// Errors a single account sync attempt can produce.
///
/// These never leave the account worker: they are captured into the
/// account's result so sibling accounts keep running.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountSyncError {
    /// The downstream API rejected or failed the request.
    #[error("API error: {message}")]
    Api { message: String },

    /// The attempt exceeded the configured per-account timeout.
    #[error("Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Network or connection error.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The run was cancelled before the attempt finished.
    #[error("Cancelled")]
    Cancelled,

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AccountSyncError {
    /// Create an API error.
    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether another attempt may succeed. Only cancellation is final.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, so multi-line details from a
/// client do not flood progress output or top-error summaries.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

//! Error types for UniStore operations.
//!
//! Errors never cross the store facade during a purchase: buy and restore
//! degrade to events or `false`. `UniStoreError` is what construction,
//! configuration loading and the internal plumbing report.

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum UniStoreErrorCode {
    /// Store not initialized yet
    NotInitialized = 1000,
    /// Product id is not in the catalog
    UnknownProduct = 1001,
    /// Purchasing provider reported an error
    Provider = 2000,
    /// Selected backend has no provider attached
    ProviderMissing = 2001,
    /// Transport/network layer error
    Transport = 3000,
    /// Connection failed
    ConnectionFailed = 3001,
    /// Connection timeout
    ConnectionTimeout = 3002,
    /// Invalid request/data
    InvalidData = 5000,
    /// Serialization error
    Serialization = 5002,
    /// Purchase state machine misuse
    InvalidTransition = 6000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Error type for UniStore operations.
#[derive(Debug, thiserror::Error)]
pub enum UniStoreError {
    /// Operation attempted before the backend reported readiness.
    #[error("store is not initialized")]
    NotInitialized,

    /// Product id absent from the configured catalog.
    #[error("unknown product: {0}")]
    UnknownProduct(String),

    /// The underlying purchasing provider failed.
    #[error("{provider} provider error: {reason}")]
    Provider {
        /// Provider name (e.g. "plugin", "samsung")
        provider: String,
        /// Underlying error message
        reason: String,
    },

    /// The configured backend needs a provider handle that was not supplied.
    #[error("backend '{0}' selected but no provider was supplied")]
    ProviderMissing(String),

    /// Transport/network layer error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Connection failed.
    #[error("connection to {target} failed: {reason}")]
    ConnectionFailed {
        /// Target endpoint
        target: String,
        /// Underlying error message
        reason: String,
    },

    /// Connection timeout.
    #[error("{operation} timed out after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Invalid data provided.
    #[error("invalid {field}: {reason}")]
    InvalidData {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A purchase flow was driven through a transition it does not allow.
    #[error("invalid purchase transition from {from} to {to}")]
    InvalidTransition {
        /// State the flow was in
        from: String,
        /// State that was requested
        to: String,
    },

    /// Internal/unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl UniStoreError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> UniStoreErrorCode {
        match self {
            Self::NotInitialized => UniStoreErrorCode::NotInitialized,
            Self::UnknownProduct(_) => UniStoreErrorCode::UnknownProduct,
            Self::Provider { .. } => UniStoreErrorCode::Provider,
            Self::ProviderMissing(_) => UniStoreErrorCode::ProviderMissing,
            Self::Transport(_) => UniStoreErrorCode::Transport,
            Self::ConnectionFailed { .. } => UniStoreErrorCode::ConnectionFailed,
            Self::ConnectionTimeout { .. } => UniStoreErrorCode::ConnectionTimeout,
            Self::InvalidData { .. } => UniStoreErrorCode::InvalidData,
            Self::Serialization(_) => UniStoreErrorCode::Serialization,
            Self::InvalidTransition { .. } => UniStoreErrorCode::InvalidTransition,
            Self::Internal(_) => UniStoreErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for UniStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for UniStoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("io: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            UniStoreError::NotInitialized.code(),
            UniStoreErrorCode::NotInitialized
        );
        assert_eq!(
            UniStoreError::provider("plugin", "billing unavailable").code(),
            UniStoreErrorCode::Provider
        );
        assert_eq!(UniStoreErrorCode::Internal as i32, 9999);
    }

    #[test]
    fn test_error_display() {
        let err = UniStoreError::provider("samsung", "user cancelled");
        assert_eq!(err.to_string(), "samsung provider error: user cancelled");

        let err = UniStoreError::UnknownProduct("gems_9000".into());
        assert_eq!(err.to_string(), "unknown product: gems_9000");
        assert_eq!(err.code(), UniStoreErrorCode::UnknownProduct);

        let err = UniStoreError::invalid_data("url", "must not be empty");
        assert_eq!(err.message(), "invalid url: must not be empty");
    }

    #[test]
    fn test_from_serde_json() {
        let err: UniStoreError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.code(), UniStoreErrorCode::Serialization);
    }
}

//! Error types for workflow synchronization and job submission.

use thiserror::Error;
use wfsync_api::ApiError;

/// Main error type for engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(#[from] ApiError),

    #[error("Unresolved workflow: no identifier known for '{name}'")]
    UnresolvedWorkflow { name: String },

    #[error("Invalid job: {reason}")]
    InvalidJob { reason: String },

    #[error("Protocol violation: {message}")]
    ProtocolViolation { message: String },

    #[error("Connect failed after {attempts} attempt(s): {source}")]
    ConnectFailed {
        attempts: u32,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Definition error: {name} - {reason}")]
    Definition { name: String, reason: String },

    #[error("Unresolved body: step '{step}' of workflow '{workflow}' still references a file")]
    UnresolvedBody { workflow: String, step: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a definition error.
    pub fn definition(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Definition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid job error.
    pub fn invalid_job(reason: impl Into<String>) -> Self {
        Self::InvalidJob { reason: reason.into() }
    }

    /// Create a protocol violation error.
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation { message: message.into() }
    }

    /// Create a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }

    /// Whether another bootstrap attempt could succeed.
    ///
    /// Only transport-level and transient service failures are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(error) => error.is_retryable(),
            _ => false,
        }
    }

    /// Whether this error reports a malformed service response.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. } | Self::Remote(ApiError::ProtocolViolation { .. }))
    }
}

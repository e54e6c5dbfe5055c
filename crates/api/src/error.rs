//! Error types for workflow service requests.

use thiserror::Error;

/// Errors produced by a single request/response exchange with the workflow service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Transport error: {method} {path} - {source}")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("HTTP {status}: {method} {path} - {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Decode error: {path} - {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Protocol violation: {message}")]
    ProtocolViolation { message: String },

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Could not build the HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    /// Create a protocol violation error.
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation { message: message.into() }
    }

    /// Create an invalid base URL error.
    pub fn invalid_base_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether repeating the whole exchange later could succeed.
    ///
    /// Network failures and non-404 status responses are retryable; contract
    /// mismatches and local configuration problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }
}

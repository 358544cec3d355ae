//! Bank portal error types

use thiserror::Error;

/// Bank portal error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Form input rejected before submission
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend answered with a non-2xx status (other than 401)
    #[error("Backend error ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Backend {
        /// HTTP status code
        status: u16,
        /// Human-readable message carried in the response body, if any
        message: Option<String>,
    },

    /// Backend rejected the credential (HTTP 401)
    #[error("Authentication required")]
    Unauthorized,

    /// Request never reached the backend
    #[error("Network error: {0}")]
    Network(String),

    /// Session is valid but lacks the role required for a screen
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Session lifecycle error
    #[error("Session error: {0}")]
    Session(String),

    /// Persisted session storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Message to show next to the form or screen that triggered the error.
    ///
    /// Backend messages are surfaced verbatim; everything else falls back to
    /// the caller's generic text, except validation errors which are already
    /// written for the user.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Backend {
                message: Some(message),
                ..
            } => message.clone(),
            Error::Validation(message) | Error::Forbidden(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// True for failures that end the session (401)
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }

    /// True when the request could not reach the backend
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

/// Result type alias for bank portal operations
pub type Result<T> = std::result::Result<T, Error>;

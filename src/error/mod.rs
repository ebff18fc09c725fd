//! Error types for the auth bridge.

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for configuration, session management and CLI paths.
///
/// The adapter contract itself never surfaces this type; see
/// [`ReactiveAuth`](crate::auth::ReactiveAuth).
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Identity provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl BridgeError {
    /// Whether this error came from missing or malformed configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<AuthError> for BridgeError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Api { status, message } => BridgeError::Provider { status, message },
            other => BridgeError::Authentication(other.to_string()),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BridgeError>;

//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Every variant carries owned text so the error can be cloned and handed to
/// every caller that waited on a shared refresh attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Local precondition failure; never reaches the network
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-2xx response from the backend
    #[error("Request failed ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    RequestFailed {
        status: u16,
        message: Option<String>,
    },

    /// No response was received
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// A 401 that survived the refresh-and-replay, or a failed refresh
    ///
    /// `from_server` is set when `message` is the backend's own text.
    #[error("Session expired: {message}")]
    AuthExpired { message: String, from_server: bool },

    /// Response body did not have the expected shape
    #[error("Response error: {0}")]
    Decode(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an auth-expired error with locally generated text
    pub fn auth_expired(msg: impl Into<String>) -> Self {
        Self::AuthExpired {
            message: msg.into(),
            from_server: false,
        }
    }

    /// Create an auth-expired error carrying the backend's message
    pub fn server_auth_expired(msg: impl Into<String>) -> Self {
        Self::AuthExpired {
            message: msg.into(),
            from_server: true,
        }
    }

    /// Create a network error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::NetworkUnreachable(msg.into())
    }

    /// HTTP status carried by the error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            Self::AuthExpired { .. } => Some(401),
            _ => None,
        }
    }

    /// Text to show the user
    ///
    /// Server-provided messages and local validation messages are shown as-is;
    /// everything else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::RequestFailed {
                message: Some(msg), ..
            } if !msg.trim().is_empty() => msg.clone(),
            Self::AuthExpired {
                message,
                from_server: true,
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

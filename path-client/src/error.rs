//! Client error types

use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Shown when a save fails without a server message
pub const SAVE_FALLBACK: &str = "Failed to save data. Please try again.";

/// Shown when a fetch fails without a server message
pub const FETCH_FALLBACK: &str = "Failed to fetch patient details. Please try again.";

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error status
    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request rejected as invalid
    #[error("Validation error: {0}")]
    Validation(String),

    /// Base URL cannot carry a request path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Message from the server body, if it sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } => message.as_deref(),
            ClientError::NotFound(m) | ClientError::Validation(m) if !m.is_empty() => {
                Some(m.as_str())
            }
            _ => None,
        }
    }

    /// Operator-facing error: the server message verbatim, or `fallback`
    pub fn into_app_error(self, fallback: &str) -> AppError {
        let message = self.server_message().unwrap_or(fallback).to_string();
        let code = match &self {
            ClientError::NotFound(_) => ErrorCode::NotFound,
            ClientError::Validation(_) => ErrorCode::ValidationFailed,
            ClientError::InvalidUrl(_) => ErrorCode::InvalidRequest,
            ClientError::Http(_) | ClientError::Api { .. } => ErrorCode::NetworkError,
            ClientError::InvalidResponse(_) | ClientError::Serialization(_) => {
                ErrorCode::InternalError
            }
        };
        AppError::with_message(code, message).with_detail("cause", self.to_string())
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        err.into_app_error(FETCH_FALLBACK)
    }
}

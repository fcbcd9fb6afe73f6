//! Error types for the dashboard HTTP client.

use thiserror::Error;
use todo_dashboard_core::{Collection, TransportError};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the dashboard API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The configured base URL cannot be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Maps this error onto the core transport taxonomy.
    pub fn into_transport(self, collection: Collection) -> TransportError {
        match self {
            ClientError::Api { status, message } => {
                TransportError::status(collection, status, message)
            }
            ClientError::Json(e) => TransportError::decode(collection, e.to_string()),
            ClientError::Http(e) if e.is_decode() => {
                TransportError::decode(collection, e.to_string())
            }
            other => TransportError::network(collection, other.to_string()),
        }
    }
}

//! Error types for the dashboard core.
//!
//! Nothing here is fatal to the process. A [`TransportError`] fails one reload
//! cycle and leaves the previous snapshot in place; a [`MalformedRecord`] is a
//! diagnostic attached to an otherwise successful cycle.

use thiserror::Error;

use crate::dashboard::{Collection, RecordId};

/// Type alias for results of collection fetches.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Failure to read one collection from the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("Request for {collection} failed: {message}")]
    Network {
        collection: Collection,
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("Request for {collection} returned HTTP {status}: {message}")]
    Status {
        collection: Collection,
        status: u16,
        message: String,
    },

    /// The body was not an array of JSON objects.
    #[error("Malformed {collection} payload: {message}")]
    Decode {
        collection: Collection,
        message: String,
    },
}

impl TransportError {
    pub fn network(collection: Collection, message: impl Into<String>) -> Self {
        Self::Network {
            collection,
            message: message.into(),
        }
    }

    pub fn status(collection: Collection, status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            collection,
            status,
            message: message.into(),
        }
    }

    pub fn decode(collection: Collection, message: impl Into<String>) -> Self {
        Self::Decode {
            collection,
            message: message.into(),
        }
    }

    /// The collection whose fetch failed.
    pub fn collection(&self) -> Collection {
        match self {
            Self::Network { collection, .. }
            | Self::Status { collection, .. }
            | Self::Decode { collection, .. } => *collection,
        }
    }
}

/// A record that decoded but is missing fields the dashboard expects.
///
/// Joins and renderers degrade to sentinel values for such records; the
/// synchronizer only logs and counts them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{collection}[{index}] (id {}) is missing {}",
    .id.as_ref().map(RecordId::as_str).unwrap_or("?"),
    .missing_fields.join(", ")
)]
pub struct MalformedRecord {
    pub collection: Collection,
    pub index: usize,
    pub id: Option<RecordId>,
    pub missing_fields: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_names_collection() {
        let err = TransportError::status(Collection::Members, 503, "unavailable");
        assert_eq!(err.collection(), Collection::Members);
        assert_eq!(
            err.to_string(),
            "Request for members returned HTTP 503: unavailable"
        );
    }

    #[test]
    fn test_malformed_record_display() {
        let record = MalformedRecord {
            collection: Collection::Tasks,
            index: 2,
            id: None,
            missing_fields: vec!["id", "title"],
        };
        assert_eq!(record.to_string(), "tasks[2] (id ?) is missing id, title");
    }
}

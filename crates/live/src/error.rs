//! Error types for the push-channel client.
//!
//! None of these are surfaced as hard failures: the client logs them and
//! reconnects.

use std::time::Duration;

use thiserror::Error;

/// Reasons a push-channel connection ended or could not be established.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid push-channel URL: {0}")]
    InvalidUrl(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("No handshake received within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Connection closed before handshake")]
    ClosedDuringHandshake,

    #[error("No heartbeat received within {0:?}")]
    HeartbeatTimeout(Duration),

    #[error("Namespace connect rejected: {0}")]
    ConnectRejected(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ConnectionError::WebSocket(err.to_string())
    }
}

/// Errors decoding Engine.IO / Socket.IO text frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty frame")]
    Empty,

    #[error("Unknown {layer} packet type '{kind}'")]
    UnknownPacketType { layer: &'static str, kind: char },

    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("Invalid ack id: {0}")]
    InvalidAckId(String),
}

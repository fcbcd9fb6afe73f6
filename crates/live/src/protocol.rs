//! Engine.IO v4 / Socket.IO v4 text framing.
//!
//! Only what a websocket-only, receive-mostly client needs: the open
//! handshake, heartbeats, namespace connect/disconnect, and event packets.
//! Binary attachments are recognized and skipped.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;

pub const DEFAULT_NAMESPACE: &str = "/";

/// Payload of the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// How long the connection may stay silent before it is considered dead.
    pub fn heartbeat_deadline(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// Engine.IO transport-level packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        sid: Option<String>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: Option<u64>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
    /// Binary event or ack; attachments follow as separate frames.
    Binary {
        namespace: String,
    },
}

/// Decodes one text frame.
pub fn decode(frame: &str) -> Result<EnginePacket, ProtocolError> {
    let (kind, body) = split_kind(frame)?;
    match kind {
        '0' => serde_json::from_str(body)
            .map(EnginePacket::Open)
            .map_err(|e| ProtocolError::InvalidHandshake(e.to_string())),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(body.to_string())),
        '3' => Ok(EnginePacket::Pong(body.to_string())),
        '4' => decode_socket_packet(body).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ProtocolError::UnknownPacketType {
            layer: "engine",
            kind: other,
        }),
    }
}

/// Heartbeat reply to a server ping carrying `payload`.
pub fn encode_pong(payload: &str) -> String {
    format!("3{}", payload)
}

/// Namespace connect request.
pub fn encode_connect(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        "40".to_string()
    } else {
        format!("40{},", namespace)
    }
}

/// Namespace disconnect notice.
pub fn encode_disconnect(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        "41".to_string()
    } else {
        format!("41{},", namespace)
    }
}

fn split_kind(frame: &str) -> Result<(char, &str), ProtocolError> {
    let kind = frame.chars().next().ok_or(ProtocolError::Empty)?;
    Ok((kind, &frame[kind.len_utf8()..]))
}

fn decode_socket_packet(body: &str) -> Result<SocketPacket, ProtocolError> {
    let (kind, rest) = split_kind(body)?;
    let (namespace, rest) = split_namespace(rest);
    let (ack_id, payload) = split_ack_id(rest)?;

    match kind {
        '0' => Ok(SocketPacket::Connect {
            namespace,
            sid: parse_json(payload)
                .and_then(|v| v.get("sid").and_then(Value::as_str).map(str::to_string)),
        }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let (name, args) = decode_event(payload)?;
            Ok(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            })
        }
        '3' => Ok(SocketPacket::Ack { namespace, ack_id }),
        '4' => {
            let message = match parse_json(payload) {
                Some(Value::Object(fields)) => fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(fields.clone()).to_string()),
                Some(other) => other.to_string(),
                None => payload.to_string(),
            };
            Ok(SocketPacket::ConnectError { namespace, message })
        }
        '5' | '6' => Ok(SocketPacket::Binary { namespace }),
        other => Err(ProtocolError::UnknownPacketType {
            layer: "socket",
            kind: other,
        }),
    }
}

/// Splits an optional `/namespace,` prefix.
fn split_namespace(rest: &str) -> (String, &str) {
    if !rest.starts_with('/') {
        return (DEFAULT_NAMESPACE.to_string(), rest);
    }
    match rest.find(',') {
        Some(end) => (rest[..end].to_string(), &rest[end + 1..]),
        None => (rest.to_string(), ""),
    }
}

/// Splits an optional numeric ack id preceding the JSON payload.
fn split_ack_id(rest: &str) -> Result<(Option<u64>, &str), ProtocolError> {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Ok((None, rest));
    }
    let id = rest[..digits]
        .parse()
        .map_err(|_| ProtocolError::InvalidAckId(rest[..digits].to_string()))?;
    Ok((Some(id), &rest[digits..]))
}

fn decode_event(payload: &str) -> Result<(String, Vec<Value>), ProtocolError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ProtocolError::InvalidEvent(e.to_string()))?;
    let Value::Array(mut items) = value else {
        return Err(ProtocolError::InvalidEvent("payload is not an array".into()));
    };
    if items.is_empty() {
        return Err(ProtocolError::InvalidEvent("missing event name".into()));
    }
    match items.remove(0) {
        Value::String(name) => Ok((name, items)),
        other => Err(ProtocolError::InvalidEvent(format!(
            "event name is not a string: {}",
            other
        ))),
    }
}

fn parse_json(payload: &str) -> Option<Value> {
    if payload.is_empty() {
        None
    } else {
        serde_json::from_str(payload).ok()
    }
}

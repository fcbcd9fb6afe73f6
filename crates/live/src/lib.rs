//! Todo Dashboard Live - push-channel client for backend change events.
//!
//! Speaks Socket.IO v4 over a single WebSocket (Engine.IO v4, websocket
//! transport only), reconnects with exponential backoff, and implements the
//! core [`NotificationSource`](todo_dashboard_core::NotificationSource) trait
//! so the synchronizer can subscribe to change events.
//!
//! One client per process is the norm; [`shared_client`] hands out that
//! instance and [`reset_shared_client`] tears it down.

mod client;
mod config;
mod error;
pub mod protocol;
mod shared;

pub use client::{ConnectionStatus, LiveClient};
pub use config::{LiveConfig, ReconnectPolicy};
pub use error::{ConnectionError, ProtocolError};
pub use shared::{current_shared_client, reset_shared_client, shared_client};

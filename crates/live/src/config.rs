use std::time::Duration;

use rand::Rng;
use url::Url;

use crate::error::ConnectionError;

/// Engine.IO protocol revision spoken by this client.
pub const ENGINE_IO_VERSION: u8 = 4;

/// Default handshake path of a Socket.IO server.
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Backoff between reconnection attempts.
///
/// Delays grow as `initial_delay * 2^attempt`, are randomized by
/// `randomization_factor`, and never exceed `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub randomization_factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            randomization_factor: 0.5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnection attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms =
            self.initial_delay.as_millis() as f64 * 2f64.powi(attempt.min(31) as i32);
        let max_ms = self.max_delay.as_millis() as f64;

        let mut delay_ms = base_ms;
        if self.randomization_factor > 0.0 {
            let mut rng = rand::thread_rng();
            let deviation = rng.gen::<f64>() * self.randomization_factor * base_ms;
            delay_ms = if rng.gen_bool(0.5) {
                base_ms - deviation
            } else {
                base_ms + deviation
            };
        }

        Duration::from_millis(delay_ms.clamp(0.0, max_ms) as u64)
    }
}

/// Where and how the push-channel client connects.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    /// Backend base URL (`http`, `https`, `ws`, or `wss`).
    pub server_url: Url,
    /// Socket.IO namespace, `/` for the default one.
    pub namespace: String,
    pub reconnect: ReconnectPolicy,
    pub handshake_timeout: Duration,
}

impl LiveConfig {
    pub fn new(server_url: &str) -> Result<Self, ConnectionError> {
        let server_url = Url::parse(server_url.trim())
            .map_err(|e| ConnectionError::InvalidUrl(format!("{}: {}", server_url, e)))?;
        if !matches!(server_url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConnectionError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                server_url,
                server_url.scheme()
            )));
        }

        Ok(Self {
            server_url,
            namespace: "/".to_string(),
            reconnect: ReconnectPolicy::default(),
            handshake_timeout: Duration::from_secs(20),
        })
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// WebSocket endpoint, e.g. `ws://host:3000/socket.io/?EIO=4&transport=websocket`.
    pub fn endpoint(&self) -> Url {
        let mut endpoint = self.server_url.clone();
        let scheme = match endpoint.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // http(s) -> ws(s) only moves between special schemes, which url allows.
        let _ = endpoint.set_scheme(scheme);
        endpoint.set_path(SOCKET_IO_PATH);
        endpoint.set_query(Some(&format!(
            "EIO={}&transport=websocket",
            ENGINE_IO_VERSION
        )));
        endpoint.set_fragment(None);
        endpoint
    }
}

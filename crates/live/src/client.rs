//! Reconnecting Socket.IO client that feeds change events to subscribers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use todo_dashboard_core::{
    ChangeEvent, EventHandler, HandlerRegistry, NotificationSource, SubscriptionId,
};

use crate::config::{LiveConfig, ReconnectPolicy};
use crate::error::ConnectionError;
use crate::protocol::{self, EnginePacket, Handshake, SocketPacket};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle as observed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No subscriber has asked for the connection yet.
    Idle,
    Connecting,
    /// Namespace connected; events are being delivered.
    Connected,
    /// Between attempts; events are not delivered until reconnected.
    Disconnected,
    /// Shut down; will not reconnect.
    Closed,
}

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Push-channel client.
///
/// The connection is opened lazily by the first [`subscribe`] and kept alive
/// (reconnecting as needed) until [`shutdown`] or drop.
///
/// [`subscribe`]: NotificationSource::subscribe
/// [`shutdown`]: LiveClient::shutdown
pub struct LiveClient {
    config: LiveConfig,
    registry: Arc<HandlerRegistry>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    attempts: Arc<AtomicU32>,
    worker: Mutex<Option<Worker>>,
}

impl LiveClient {
    pub fn new(config: LiveConfig) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            config,
            registry: Arc::new(HandlerRegistry::new()),
            status: Arc::new(status),
            attempts: Arc::new(AtomicU32::new(0)),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Failed connection attempts since the namespace was last connected.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.lock_worker()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Starts the connection task if it is not running yet.
    ///
    /// Returns `false` when called outside a Tokio runtime; the next call
    /// from inside one will start it.
    pub fn connect(&self) -> bool {
        let mut worker = self.lock_worker();
        if worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
        {
            return true;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime available, push channel not started");
            return false;
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let session = Session {
            endpoint: self.config.endpoint(),
            namespace: self.config.namespace.clone(),
            handshake_timeout: self.config.handshake_timeout,
            reconnect: self.config.reconnect.clone(),
            registry: Arc::clone(&self.registry),
            status: Arc::clone(&self.status),
            attempts: Arc::clone(&self.attempts),
        };
        info!("Starting push channel to {}", session.endpoint);
        let handle = runtime.spawn(session.run(shutdown_rx));
        *worker = Some(Worker { shutdown, handle });
        true
    }

    /// Stops the connection task and waits for it to exit.
    pub async fn shutdown(&self) {
        let worker = self.lock_worker().take();
        if let Some(worker) = worker {
            let _ = worker.shutdown.send(true);
            if let Err(e) = worker.handle.await {
                if !e.is_cancelled() {
                    warn!("Push channel task ended abnormally: {}", e);
                }
            }
        }
        self.status.send_replace(ConnectionStatus::Closed);
    }

    /// Asks the connection task to stop without waiting for it.
    ///
    /// The task still disconnects from the namespace before it exits.
    pub fn shutdown_now(&self) {
        if let Some(worker) = self.lock_worker().take() {
            let _ = worker.shutdown.send(true);
            self.status.send_replace(ConnectionStatus::Closed);
        }
    }

    /// Number of handlers currently registered.
    pub fn handler_count(&self) -> usize {
        self.registry.total_handlers()
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NotificationSource for LiveClient {
    fn subscribe(&self, event: ChangeEvent, handler: EventHandler) -> SubscriptionId {
        let id = self.registry.subscribe(event, handler);
        self.connect();
        id
    }

    fn unsubscribe(&self, event: ChangeEvent, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(event, id)
    }
}

impl Drop for LiveClient {
    fn drop(&mut self) {
        self.shutdown_now();
    }
}

/// How a session ended without an error.
enum SessionEnd {
    ServerClosed,
    Shutdown,
}

/// What to do after handling one frame.
enum Action {
    Continue,
    Reply(String),
    Stop,
}

/// Everything the connection task needs, detached from the client handle.
struct Session {
    endpoint: Url,
    namespace: String,
    handshake_timeout: Duration,
    reconnect: ReconnectPolicy,
    registry: Arc<HandlerRegistry>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    attempts: Arc<AtomicU32>,
}

impl Session {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            self.status.send_replace(ConnectionStatus::Connecting);
            match self.connect_once(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::ServerClosed) => info!("Push channel closed by server"),
                Err(e) => warn!("Push channel disconnected: {}", e),
            }
            self.status.send_replace(ConnectionStatus::Disconnected);

            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            let delay = self.reconnect.delay_for(attempt);
            info!(
                "Reconnecting push channel in {:?} (attempt {})",
                delay,
                attempt + 1
            );
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.status.send_replace(ConnectionStatus::Closed);
        info!("Push channel stopped");
    }

    /// One connection from WebSocket open to close.
    ///
    /// On shutdown the namespace is disconnected and the socket closed
    /// before returning.
    async fn connect_once(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, ConnectionError> {
        let opened = tokio::select! {
            _ = shutdown_requested(shutdown) => None,
            opened = self.open() => Some(opened?),
        };
        let Some((mut socket, handshake)) = opened else {
            return Ok(SessionEnd::Shutdown);
        };

        let deadline = handshake.heartbeat_deadline();
        loop {
            let next = tokio::select! {
                _ = shutdown_requested(shutdown) => None,
                frame = tokio::time::timeout(deadline, socket.next()) => Some(frame),
            };
            let Some(next) = next else {
                self.disconnect(&mut socket).await;
                return Ok(SessionEnd::Shutdown);
            };

            let frame = match next {
                Err(_) => return Err(ConnectionError::HeartbeatTimeout(deadline)),
                Ok(None) => return Ok(SessionEnd::ServerClosed),
                Ok(Some(frame)) => frame?,
            };

            let action = match frame {
                Message::Text(text) => self.handle_frame(text.as_str())?,
                Message::Close(_) => Action::Stop,
                _ => Action::Continue,
            };

            match action {
                Action::Continue => {}
                Action::Reply(reply) => socket.send(Message::Text(reply.into())).await?,
                Action::Stop => {
                    let _ = socket.close(None).await;
                    return Ok(SessionEnd::ServerClosed);
                }
            }
        }
    }

    /// Opens the WebSocket, waits for the Engine.IO handshake and requests
    /// the namespace.
    async fn open(&self) -> Result<(Socket, Handshake), ConnectionError> {
        let (mut socket, _) = connect_async(self.endpoint.as_str()).await?;
        debug!("WebSocket open to {}", self.endpoint);

        let handshake = tokio::time::timeout(self.handshake_timeout, read_handshake(&mut socket))
            .await
            .map_err(|_| ConnectionError::HandshakeTimeout(self.handshake_timeout))??;
        debug!("Engine.IO session {} opened", handshake.sid);

        socket
            .send(Message::Text(protocol::encode_connect(&self.namespace).into()))
            .await?;
        Ok((socket, handshake))
    }

    async fn disconnect(&self, socket: &mut Socket) {
        debug!("Disconnecting from namespace {}", self.namespace);
        let frame = protocol::encode_disconnect(&self.namespace);
        if let Err(e) = socket.send(Message::Text(frame.into())).await {
            debug!("Namespace disconnect not sent: {}", e);
        }
        let _ = socket.close(None).await;
    }

    fn handle_frame(&self, text: &str) -> Result<Action, ConnectionError> {
        let packet = match protocol::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Ignoring undecodable push frame: {}", e);
                return Ok(Action::Continue);
            }
        };

        match packet {
            EnginePacket::Ping(payload) => Ok(Action::Reply(protocol::encode_pong(&payload))),
            EnginePacket::Close => Ok(Action::Stop),
            EnginePacket::Message(packet) => self.handle_socket_packet(packet),
            other => {
                debug!("Ignoring engine packet {:?}", other);
                Ok(Action::Continue)
            }
        }
    }

    fn handle_socket_packet(&self, packet: SocketPacket) -> Result<Action, ConnectionError> {
        match packet {
            SocketPacket::Connect { namespace, sid } if namespace == self.namespace => {
                self.attempts.store(0, Ordering::SeqCst);
                self.status.send_replace(ConnectionStatus::Connected);
                info!(
                    "Push channel connected to namespace {} (sid {})",
                    namespace,
                    sid.as_deref().unwrap_or("-")
                );
                Ok(Action::Continue)
            }
            SocketPacket::Event {
                namespace, name, ..
            } if namespace == self.namespace => {
                match ChangeEvent::from_name(&name) {
                    Some(event) => {
                        let delivered = self.registry.dispatch(event);
                        debug!("Delivered {} to {} handler(s)", event, delivered);
                    }
                    None => debug!("Ignoring unrecognized event {}", name),
                }
                Ok(Action::Continue)
            }
            SocketPacket::Disconnect { namespace } if namespace == self.namespace => {
                Ok(Action::Stop)
            }
            SocketPacket::ConnectError { namespace, message } if namespace == self.namespace => {
                Err(ConnectionError::ConnectRejected(message))
            }
            other => {
                debug!("Ignoring socket packet {:?}", other);
                Ok(Action::Continue)
            }
        }
    }
}

/// Reads frames until the Engine.IO open packet arrives.
async fn read_handshake(socket: &mut Socket) -> Result<Handshake, ConnectionError> {
    while let Some(frame) = socket.next().await {
        match frame? {
            Message::Text(text) => match protocol::decode(text.as_str())? {
                EnginePacket::Open(handshake) => return Ok(handshake),
                other => debug!("Skipping {:?} before handshake", other),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(ConnectionError::ClosedDuringHandshake)
}

/// Resolves once shutdown is requested or the client handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let config = LiveConfig::new("http://localhost:3000").unwrap();
        let (status, _) = watch::channel(ConnectionStatus::Connecting);
        Session {
            endpoint: config.endpoint(),
            namespace: config.namespace.clone(),
            handshake_timeout: config.handshake_timeout,
            reconnect: config.reconnect.clone(),
            registry: Arc::new(HandlerRegistry::new()),
            status: Arc::new(status),
            attempts: Arc::new(AtomicU32::new(3)),
        }
    }

    #[test]
    fn namespace_connect_resets_backoff() {
        let session = session();

        let action = session.handle_frame(r#"40{"sid":"abc"}"#).unwrap();

        assert!(matches!(action, Action::Continue));
        assert_eq!(session.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(*session.status.borrow(), ConnectionStatus::Connected);
    }

    #[test]
    fn connect_error_rejects_the_session() {
        let session = session();

        let err = session
            .handle_frame(r#"44{"message":"Not authorized"}"#)
            .err()
            .unwrap();

        assert!(matches!(err, ConnectionError::ConnectRejected(ref m) if m == "Not authorized"));
        assert_eq!(session.attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn ping_is_answered_and_close_stops() {
        let session = session();

        assert!(matches!(session.handle_frame("2"), Ok(Action::Reply(ref r)) if r == "3"));
        assert!(matches!(session.handle_frame("1"), Ok(Action::Stop)));
        assert!(matches!(session.handle_frame("41"), Ok(Action::Stop)));
        assert!(matches!(session.handle_frame("zz"), Ok(Action::Continue)));
    }

    #[test]
    fn events_reach_registered_handlers() {
        let session = session();
        let (tx, rx) = std::sync::mpsc::channel();
        session.registry.subscribe(
            ChangeEvent::MembersUpdated,
            Arc::new(move |event| {
                let _ = tx.send(event);
            }),
        );

        session.handle_frame(r#"42["membersUpdated",{}]"#).unwrap();
        session.handle_frame(r#"42/other,["membersUpdated"]"#).unwrap();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ChangeEvent::MembersUpdated]);
    }
}

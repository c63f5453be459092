use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::transport::{Connector, Frame, Transport};
use crate::error::ConnectionError;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::session::MessageSink;

/// Identifies one `open` call. Events from older attempts are discarded.
pub type AttemptId = u64;

/// How a closed channel came to be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// The local side asked for the close before it happened.
    Intentional,
    /// The server or the network ended the channel.
    Unexpected,
}

/// Classified connection events, in transport delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionNotice {
    Opened,
    Message(ServerMessage),
    Closed {
        kind: CloseKind,
        code: Option<u16>,
        reason: String,
    },
    Failed {
        reason: String,
    },
}

/// Raw event reported by a transport task.
#[derive(Debug)]
enum RawEvent {
    Opened,
    Text(String),
    Closed { code: Option<u16>, reason: String },
    Failed(String),
}

#[derive(Debug)]
struct Envelope {
    attempt: AttemptId,
    event: RawEvent,
}

#[derive(Debug)]
enum Command {
    Send(String),
    Close { code: u16, reason: String },
}

/// The manager's record of the live channel.
#[derive(Debug)]
struct Connection {
    attempt: AttemptId,
    is_open: bool,
    close_was_intentional: bool,
    commands: mpsc::UnboundedSender<Command>,
}

/// Owns the session channel: opens it, sends on it, closes it, and turns
/// transport events into [`ConnectionNotice`]s.
///
/// All methods are synchronous and meant to be called from one logical
/// thread; transport I/O happens in a task spawned on `runtime`.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    runtime: Handle,
    connect_timeout: Duration,
    connection: Option<Connection>,
    next_attempt: AttemptId,
    events_tx: mpsc::UnboundedSender<Envelope>,
    events_rx: mpsc::UnboundedReceiver<Envelope>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, runtime: Handle, connect_timeout: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        ConnectionManager {
            connector,
            runtime,
            connect_timeout,
            connection: None,
            next_attempt: 0,
            events_tx,
            events_rx,
        }
    }

    /// Start connecting to `endpoint` as `username`.
    ///
    /// Returns the attempt already in flight if there is one that is not
    /// being closed, so repeated calls for one session open one channel.
    pub fn open(&mut self, endpoint: &Url, username: &str) -> Result<AttemptId, ConnectionError> {
        if let Some(conn) = &self.connection {
            if !conn.close_was_intentional {
                debug!(attempt = conn.attempt, "open ignored, attempt already live");
                return Ok(conn.attempt);
            }
        }

        let url = session_url(endpoint, username)?;
        self.next_attempt += 1;
        let attempt = self.next_attempt;

        let (commands, command_rx) = mpsc::unbounded_channel();
        self.runtime.spawn(run_connection(
            Arc::clone(&self.connector),
            url.clone(),
            self.connect_timeout,
            attempt,
            self.events_tx.clone(),
            command_rx,
        ));

        self.connection = Some(Connection {
            attempt,
            is_open: false,
            close_was_intentional: false,
            commands,
        });
        info!(attempt, url = %url, "opening session channel");
        Ok(attempt)
    }

    /// Queue a message on the open channel.
    pub fn send(&mut self, message: &ClientMessage) -> Result<(), ConnectionError> {
        let conn = self
            .connection
            .as_ref()
            .filter(|c| c.is_open)
            .ok_or(ConnectionError::NotOpen)?;
        let text = protocol::encode(message)?;
        conn.commands
            .send(Command::Send(text))
            .map_err(|_| ConnectionError::NotOpen)
    }

    /// Close the channel. The intentional flag is recorded before the close
    /// is issued so the resulting notification can be classified.
    pub fn close(&mut self, code: u16, reason: &str, intentional: bool) {
        let Some(conn) = self.connection.as_mut() else {
            debug!("close requested with no connection");
            return;
        };

        conn.close_was_intentional = intentional;
        conn.is_open = false;
        info!(attempt = conn.attempt, code, reason, intentional, "closing session channel");

        let command = Command::Close {
            code,
            reason: reason.to_string(),
        };
        if conn.commands.send(command).is_err() {
            debug!(attempt = conn.attempt, "transport task already finished");
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_open)
    }

    /// Attempt id of the current connection, if any.
    pub fn current_attempt(&self) -> Option<AttemptId> {
        self.connection.as_ref().map(|c| c.attempt)
    }

    /// Next pending notice without waiting.
    pub fn try_next(&mut self) -> Option<ConnectionNotice> {
        while let Ok(envelope) = self.events_rx.try_recv() {
            if let Some(notice) = self.classify(envelope) {
                return Some(notice);
            }
        }
        None
    }

    /// Wait for the next notice.
    pub async fn next(&mut self) -> Option<ConnectionNotice> {
        loop {
            let envelope = self.events_rx.recv().await?;
            if let Some(notice) = self.classify(envelope) {
                return Some(notice);
            }
        }
    }

    fn classify(&mut self, envelope: Envelope) -> Option<ConnectionNotice> {
        let Envelope { attempt, event } = envelope;
        let Some(conn) = self.connection.as_mut().filter(|c| c.attempt == attempt) else {
            debug!(attempt, ?event, "dropping event from superseded attempt");
            return None;
        };

        match event {
            RawEvent::Opened => {
                if conn.close_was_intentional {
                    return None;
                }
                conn.is_open = true;
                info!(attempt, "session channel open");
                Some(ConnectionNotice::Opened)
            }
            RawEvent::Text(text) => {
                if conn.close_was_intentional {
                    debug!(attempt, "dropping message received after close request");
                    return None;
                }
                match protocol::decode(&text) {
                    Ok(message) => {
                        debug!(attempt, kind = message.kind(), "received message");
                        Some(ConnectionNotice::Message(message))
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, raw = %text, "dropping undecodable frame");
                        None
                    }
                }
            }
            RawEvent::Closed { code, reason } => {
                let kind = if conn.close_was_intentional {
                    CloseKind::Intentional
                } else {
                    CloseKind::Unexpected
                };
                self.connection = None;
                info!(attempt, ?code, reason = %reason, ?kind, "session channel closed");
                Some(ConnectionNotice::Closed { kind, code, reason })
            }
            RawEvent::Failed(reason) => {
                let intentional = conn.close_was_intentional;
                self.connection = None;
                if intentional {
                    debug!(attempt, reason = %reason, "transport error after close request");
                    Some(ConnectionNotice::Closed {
                        kind: CloseKind::Intentional,
                        code: None,
                        reason,
                    })
                } else {
                    warn!(attempt, reason = %reason, "session channel failed");
                    Some(ConnectionNotice::Failed { reason })
                }
            }
        }
    }
}

/// Build the per-session URL: `endpoint` with a `username` query parameter.
pub fn session_url(endpoint: &Url, username: &str) -> Result<Url, ConnectionError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ConnectionError::MissingUsername);
    }
    if endpoint.scheme() != "ws" {
        return Err(ConnectionError::InvalidEndpoint(format!(
            "unsupported scheme '{}' (expected ws)",
            endpoint.scheme()
        )));
    }

    let mut url = endpoint.clone();
    url.query_pairs_mut().append_pair("username", username);
    Ok(url)
}

/// Transport task for one attempt: connect, then shuttle commands out and
/// frames in until either side closes.
async fn run_connection(
    connector: Arc<dyn Connector>,
    url: Url,
    connect_timeout: Duration,
    attempt: AttemptId,
    events: mpsc::UnboundedSender<Envelope>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let emit = |event: RawEvent| {
        if events.send(Envelope { attempt, event }).is_err() {
            debug!(attempt, "connection manager dropped");
        }
    };

    let mut transport: Box<dyn Transport> =
        match tokio::time::timeout(connect_timeout, connector.connect(&url)).await {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                emit(RawEvent::Failed(e.to_string()));
                return;
            }
            Err(_) => {
                emit(RawEvent::Failed(
                    ConnectionError::TimedOut(connect_timeout).to_string(),
                ));
                return;
            }
        };
    emit(RawEvent::Opened);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    if let Err(e) = transport.send(text).await {
                        emit(RawEvent::Failed(e.to_string()));
                        break;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    if let Err(e) = transport.close(code, reason.clone()).await {
                        debug!(attempt, error = %e, "close handshake failed");
                    }
                    emit(RawEvent::Closed { code: Some(code), reason });
                    break;
                }
                None => {
                    // Manager gone; nobody is listening for the outcome.
                    let _ = transport.close(1001, "client shutting down".to_string()).await;
                    break;
                }
            },
            frame = transport.recv() => match frame {
                Some(Ok(Frame::Text(text))) => emit(RawEvent::Text(text)),
                Some(Ok(Frame::Close { code, reason })) => {
                    emit(RawEvent::Closed { code, reason });
                    break;
                }
                Some(Err(e)) => {
                    emit(RawEvent::Failed(e.to_string()));
                    break;
                }
                None => {
                    emit(RawEvent::Closed { code: None, reason: String::new() });
                    break;
                }
            },
        }
    }
    debug!(attempt, "transport task finished");
}

impl MessageSink for ConnectionManager {
    fn send(&mut self, message: &ClientMessage) -> Result<(), ConnectionError> {
        ConnectionManager::send(self, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Player;
    use crate::net::memory::MemoryConnector;
    use async_trait::async_trait;

    /// Accepts the connect call and never finishes it.
    struct HangingConnector;

    #[async_trait]
    impl Connector for HangingConnector {
        async fn connect(&self, _url: &Url) -> Result<Box<dyn Transport>, ConnectionError> {
            std::future::pending().await
        }
    }

    fn endpoint() -> Url {
        Url::parse("ws://localhost:8080/ws/game").unwrap()
    }

    fn manager(connector: MemoryConnector) -> ConnectionManager {
        ConnectionManager::new(
            Arc::new(connector),
            Handle::current(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_session_url_appends_username() {
        let url = session_url(&endpoint(), "alice").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/ws/game?username=alice");

        let url = session_url(&endpoint(), "a b&c").unwrap();
        assert_eq!(url.query(), Some("username=a+b%26c"));
    }

    #[test]
    fn test_session_url_rejects_bad_input() {
        assert!(matches!(
            session_url(&endpoint(), "  "),
            Err(ConnectionError::MissingUsername)
        ));
        let http = Url::parse("http://localhost:8080/ws/game").unwrap();
        assert!(matches!(
            session_url(&http, "alice"),
            Err(ConnectionError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_open_reports_opened_and_passes_username() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut manager = manager(connector);

        manager.open(&endpoint(), "alice").unwrap();
        assert!(!manager.is_open());

        let peer = peers.recv().await.unwrap();
        assert_eq!(peer.username().as_deref(), Some("alice"));
        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));
        assert!(manager.is_open());
    }

    #[tokio::test]
    async fn test_open_is_idempotent_per_attempt() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut manager = manager(connector);

        let first = manager.open(&endpoint(), "alice").unwrap();
        let second = manager.open(&endpoint(), "alice").unwrap();
        assert_eq!(first, second);

        let _peer = peers.recv().await.unwrap();
        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));
        assert!(peers.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_requires_open_channel() {
        let (connector, _peers) = MemoryConnector::new();
        let mut manager = manager(connector);
        let msg = ClientMessage::Move {
            col: 0,
            player: Player::One,
        };
        assert!(matches!(manager.send(&msg), Err(ConnectionError::NotOpen)));
    }

    #[tokio::test]
    async fn test_send_reaches_peer() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut manager = manager(connector);
        manager.open(&endpoint(), "alice").unwrap();
        let mut peer = peers.recv().await.unwrap();
        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));

        let msg = ClientMessage::Move {
            col: 3,
            player: Player::One,
        };
        manager.send(&msg).unwrap();
        assert_eq!(peer.recv_message().await, Some(msg));
    }

    #[tokio::test]
    async fn test_inbound_messages_are_decoded_and_bad_frames_dropped() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut manager = manager(connector);
        manager.open(&endpoint(), "alice").unwrap();
        let peer = peers.recv().await.unwrap();
        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));

        peer.send_text("{not json");
        peer.send(&ServerMessage::TimerUpdate { elapsed: 4 });
        assert_eq!(
            manager.next().await,
            Some(ConnectionNotice::Message(ServerMessage::TimerUpdate {
                elapsed: 4
            }))
        );
    }

    #[tokio::test]
    async fn test_intentional_close_is_classified_intentional() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut manager = manager(connector);
        manager.open(&endpoint(), "alice").unwrap();
        let mut peer = peers.recv().await.unwrap();
        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));

        manager.close(1000, "Player returned to lobby", true);
        assert!(!manager.is_open());
        assert_eq!(
            manager.next().await,
            Some(ConnectionNotice::Closed {
                kind: CloseKind::Intentional,
                code: Some(1000),
                reason: "Player returned to lobby".to_string(),
            })
        );
        assert_eq!(
            peer.recv().await,
            Some(Frame::Close {
                code: Some(1000),
                reason: "Player returned to lobby".to_string(),
            })
        );
        assert_eq!(manager.current_attempt(), None);
    }

    #[tokio::test]
    async fn test_peer_close_is_classified_unexpected() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut manager = manager(connector);
        manager.open(&endpoint(), "alice").unwrap();
        let peer = peers.recv().await.unwrap();
        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));

        drop(peer);
        assert!(matches!(
            manager.next().await,
            Some(ConnectionNotice::Closed {
                kind: CloseKind::Unexpected,
                code: None,
                ..
            })
        ));
        assert!(!manager.is_open());
    }

    #[tokio::test]
    async fn test_refused_connect_reports_failure() {
        let (connector, _peers) = MemoryConnector::new();
        connector.refuse_connections(true);
        let mut manager = manager(connector);
        manager.open(&endpoint(), "alice").unwrap();

        let Some(ConnectionNotice::Failed { reason }) = manager.next().await else {
            panic!("expected a failure notice");
        };
        assert!(reason.contains("connection refused"));
        assert_eq!(manager.current_attempt(), None);
    }

    #[tokio::test]
    async fn test_events_from_superseded_attempt_are_dropped() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut manager = manager(connector);

        let first = manager.open(&endpoint(), "alice").unwrap();
        let old_peer = peers.recv().await.unwrap();
        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));
        manager.close(1000, "Player returned to lobby", true);

        // New session before the old close has been observed.
        let second = manager.open(&endpoint(), "alice").unwrap();
        assert_ne!(first, second);
        let new_peer = peers.recv().await.unwrap();

        old_peer.send(&ServerMessage::TimerUpdate { elapsed: 99 });
        drop(old_peer);

        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));
        new_peer.send(&ServerMessage::TimerUpdate { elapsed: 1 });
        assert_eq!(
            manager.next().await,
            Some(ConnectionNotice::Message(ServerMessage::TimerUpdate {
                elapsed: 1
            }))
        );
        assert_eq!(manager.current_attempt(), Some(second));
    }

    #[tokio::test]
    async fn test_hanging_connect_fails_after_timeout() {
        let mut manager = ConnectionManager::new(
            Arc::new(HangingConnector),
            Handle::current(),
            Duration::from_millis(50),
        );
        manager.open(&endpoint(), "alice").unwrap();

        let notice = tokio::time::timeout(Duration::from_secs(5), manager.next())
            .await
            .unwrap();
        assert_eq!(
            notice,
            Some(ConnectionNotice::Failed {
                reason: "connect timed out after 50ms".to_string(),
            })
        );
        assert!(!manager.is_open());
        assert_eq!(manager.current_attempt(), None);
    }

    #[tokio::test]
    async fn test_messages_after_close_request_are_dropped() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut manager = manager(connector);
        manager.open(&endpoint(), "alice").unwrap();
        let peer = peers.recv().await.unwrap();
        assert_eq!(manager.next().await, Some(ConnectionNotice::Opened));

        peer.send(&ServerMessage::TimerUpdate { elapsed: 7 });
        manager.close(1000, "Player returned to lobby", true);
        peer.send(&ServerMessage::TimerUpdate { elapsed: 8 });

        assert_eq!(
            manager.next().await,
            Some(ConnectionNotice::Closed {
                kind: CloseKind::Intentional,
                code: Some(1000),
                reason: "Player returned to lobby".to_string(),
            })
        );
        drop(peer);
        tokio::task::yield_now().await;
        assert_eq!(manager.try_next(), None);
    }
}

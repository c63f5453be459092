//! In-process transport pair for driving a session without a network.
//!
//! Every successful [`MemoryConnector::connect`] hands the server side of the
//! channel, a [`MemoryPeer`], to whoever holds the receiver returned by
//! [`MemoryConnector::new`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::Url;
use tokio::sync::mpsc;

use super::transport::{Connector, Frame, Transport};
use crate::error::ConnectionError;
use crate::protocol::{ClientMessage, ServerMessage};

/// Connector whose transports are backed by channels.
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    refuse: AtomicBool,
}

impl MemoryConnector {
    /// Create a connector and the receiver that yields the server side of
    /// each connection.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        (
            MemoryConnector {
                peers,
                refuse: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Make subsequent connects fail, as a down server would.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, ConnectionError> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(ConnectionError::Connect("connection refused".to_string()));
        }

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            url: url.clone(),
            to_client,
            from_client,
        };
        self.peers
            .send(peer)
            .map_err(|_| ConnectionError::Connect("no listener".to_string()))?;

        Ok(Box::new(MemoryTransport {
            to_server,
            from_server,
        }))
    }
}

/// Client side of an in-memory channel.
pub struct MemoryTransport {
    to_server: mpsc::UnboundedSender<Frame>,
    from_server: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        self.to_server
            .send(Frame::Text(text))
            .map_err(|_| ConnectionError::Transport("peer went away".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, ConnectionError>> {
        self.from_server.recv().await.map(Ok)
    }

    async fn close(&mut self, code: u16, reason: String) -> Result<(), ConnectionError> {
        // The peer may already be gone; a close toward nobody is still a close.
        let _ = self.to_server.send(Frame::Close {
            code: Some(code),
            reason,
        });
        Ok(())
    }
}

/// Server side of an in-memory channel.
pub struct MemoryPeer {
    url: Url,
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// The URL the client connected to, query string included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Value of the `username` query parameter, if any.
    pub fn username(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == "username")
            .map(|(_, value)| value.into_owned())
    }

    /// Deliver a raw text frame to the client.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(Frame::Text(text.into()));
    }

    /// Deliver a typed server message to the client.
    pub fn send(&self, message: &ServerMessage) {
        if let Ok(text) = serde_json::to_string(message) {
            self.send_text(text);
        }
    }

    /// Send a close frame to the client.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.to_client.send(Frame::Close {
            code: Some(code),
            reason: reason.to_string(),
        });
    }

    /// Next frame from the client; `None` once the client side is dropped.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Next client message, skipping anything that is not a decodable text frame.
    pub async fn recv_message(&mut self) -> Option<ClientMessage> {
        while let Some(frame) = self.recv().await {
            if let Frame::Text(text) = frame {
                if let Ok(message) = serde_json::from_str(&text) {
                    return Some(message);
                }
            }
        }
        None
    }
}

//! Transport abstraction for the session channel.
//!
//! A [`Connector`] opens one duplex text channel per session attempt; the
//! connection manager drives the resulting [`Transport`] from a background
//! task. The WebSocket implementation is what the client uses against a real
//! server.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::ConnectionError;

/// Close code sent when the user leaves a finished or abandoned session.
pub const NORMAL_CLOSURE: u16 = 1000;

/// One inbound unit from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: Option<u16>, reason: String },
}

/// A connected duplex text channel.
#[async_trait]
pub trait Transport: Send {
    /// Send one text frame.
    async fn send(&mut self, text: String) -> Result<(), ConnectionError>;

    /// Wait for the next inbound frame. `None` means the peer went away
    /// without a close handshake.
    async fn recv(&mut self) -> Option<Result<Frame, ConnectionError>>;

    /// Start a close handshake.
    async fn close(&mut self, code: u16, reason: String) -> Result<(), ConnectionError>;
}

/// Opens transports for session attempts.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, ConnectionError>;
}

/// Connects over plain `ws://` WebSockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, ConnectionError> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectionError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

/// A WebSocket session channel.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, ConnectionError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text.to_string()))),
                Ok(Message::Close(frame)) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                        None => (None, String::new()),
                    };
                    return Some(Ok(Frame::Close { code, reason }));
                }
                // Pings are answered by tungstenite; other frames carry nothing we use.
                Ok(_) => continue,
                Err(e) => return Some(Err(ConnectionError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self, code: u16, reason: String) -> Result<(), ConnectionError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.into(),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }
}

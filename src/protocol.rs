//! Wire messages exchanged with the match server.
//!
//! Every frame is one JSON object with a `type` discriminator. Inbound types
//! the client does not know decode to [`ServerMessage::Unknown`] so newer
//! servers can add messages without breaking older clients.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ProtocolError;
use crate::game::{Cell, Player};

/// Row-major board as sent by the server.
pub type BoardSnapshot = Vec<Vec<Cell>>;

/// Payload of `GAME_START`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStart {
    pub game_id: String,
    pub board: BoardSnapshot,
    pub player_number: Player,
    pub starting_player: Player,
    pub player1_name: String,
    pub player2_name: String,
}

/// Payload of an inbound `MOVE`: a placement confirmed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMade {
    pub player: Player,
    pub col: usize,
    pub row: usize,
    pub next_turn: Player,
}

/// Payload of `OPPONENT_RECONNECTED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentReconnected {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardSnapshot>,
    pub next_turn: Player,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player1_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2_name: Option<String>,
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    TimerUpdate {
        elapsed: u64,
    },
    GameStart(GameStart),
    Move(MoveMade),
    GameOver {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    OpponentDisconnected {
        message: String,
    },
    OpponentReconnected(OpponentReconnected),
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::TimerUpdate { .. } => "TIMER_UPDATE",
            ServerMessage::GameStart(_) => "GAME_START",
            ServerMessage::Move(_) => "MOVE",
            ServerMessage::GameOver { .. } => "GAME_OVER",
            ServerMessage::OpponentDisconnected { .. } => "OPPONENT_DISCONNECTED",
            ServerMessage::OpponentReconnected(_) => "OPPONENT_RECONNECTED",
            ServerMessage::Unknown => "UNKNOWN",
        }
    }
}

/// Messages sent by the client. The server assigns the row of a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Move { col: usize, player: Player },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

/// Decode one inbound text frame.
pub fn decode(text: &str) -> Result<ServerMessage, ProtocolError> {
    let message: ServerMessage = serde_json::from_str(text)?;
    if message == ServerMessage::Unknown {
        let kind = serde_json::from_str::<Envelope>(text)
            .map(|e| e.kind)
            .unwrap_or_default();
        warn!(kind = %kind, "unrecognized server message type");
    }
    Ok(message)
}

/// Encode one outbound message as a text frame.
pub fn encode(message: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

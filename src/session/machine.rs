use std::fmt;

use tracing::{debug, info, warn};

use super::state::{GameResult, Session, SessionState};
use super::timer::TimerTracker;
use crate::error::BoardError;
use crate::game::{Board, Cell, Player};
use crate::net::{CloseKind, ConnectionNotice, NORMAL_CLOSURE};
use crate::protocol::{GameStart, MoveMade, OpponentReconnected, ServerMessage};

/// Close reason sent when the user leaves a session.
pub const LOBBY_RETURN_REASON: &str = "Player returned to lobby";
/// Close reason sent when matchmaking is abandoned because no opponent came.
pub const WAIT_TIMEOUT_REASON: &str = "Matchmaking timed out";

pub const STATUS_WAITING: &str = "Waiting for an opponent...";
pub const STATUS_CONNECTION_LOST: &str = "Connection lost. Return to the lobby to play again.";
pub const STATUS_GAME_FINISHED: &str = "Game finished.";
pub const STATUS_WELCOME_BACK: &str = "Welcome back! Start a new match when ready.";
pub const STATUS_NO_OPPONENT: &str = "No opponent found. Try again later.";

/// Everything that can drive the session forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PlayRequested,
    TransportOpened,
    Message(ServerMessage),
    TransportClosed {
        kind: CloseKind,
        code: Option<u16>,
        reason: String,
    },
    TransportFailed {
        reason: String,
    },
    ReturnToLobby,
    WaitTimedOut,
}

impl From<ConnectionNotice> for SessionEvent {
    fn from(notice: ConnectionNotice) -> Self {
        match notice {
            ConnectionNotice::Opened => SessionEvent::TransportOpened,
            ConnectionNotice::Message(message) => SessionEvent::Message(message),
            ConnectionNotice::Closed { kind, code, reason } => {
                SessionEvent::TransportClosed { kind, code, reason }
            }
            ConnectionNotice::Failed { reason } => SessionEvent::TransportFailed { reason },
        }
    }
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::PlayRequested => "play requested",
            SessionEvent::TransportOpened => "transport opened",
            SessionEvent::Message(message) => message.kind(),
            SessionEvent::TransportClosed { .. } => "transport closed",
            SessionEvent::TransportFailed { .. } => "transport failed",
            SessionEvent::ReturnToLobby => "return to lobby",
            SessionEvent::WaitTimedOut => "wait timed out",
        }
    }
}

/// Side effect the owner of the machine must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenConnection,
    /// Always an intentional close.
    CloseConnection { code: u16, reason: String },
}

/// Input that did not fit the session. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    UnexpectedEvent {
        state: SessionState,
        event: &'static str,
    },
    InvalidMove {
        row: usize,
        col: usize,
        error: BoardError,
    },
    InvalidSnapshot(BoardError),
    Resync {
        game_id: String,
    },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::UnexpectedEvent { state, event } => {
                write!(f, "unexpected {event} in state {state}")
            }
            Anomaly::InvalidMove { row, col, error } => {
                write!(f, "server move to ({row}, {col}) not applied: {error}")
            }
            Anomaly::InvalidSnapshot(error) => write!(f, "board snapshot rejected: {error}"),
            Anomaly::Resync { game_id } => write!(f, "repeated GAME_START for game {game_id}"),
        }
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    pub effect: Option<Effect>,
    pub anomaly: Option<Anomaly>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Owns the session lifecycle, the board, the turn, and the timer.
///
/// Every change goes through [`SessionMachine::handle`], one event at a time
/// in arrival order. The machine never touches the network; it asks for
/// connection work through [`Effect`]s.
#[derive(Debug, Clone, Default)]
pub struct SessionMachine {
    state: SessionState,
    session: Option<Session>,
    board: Board,
    turn: Option<Player>,
    timer: TimerTracker,
    opponent_connected: bool,
    status: Option<String>,
    result: Option<GameResult>,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Seat whose turn the server last reported.
    pub fn turn(&self) -> Option<Player> {
        self.turn
    }

    /// Whether the last reported turn belongs to the local player.
    pub fn is_my_turn(&self) -> bool {
        match (&self.session, self.turn) {
            (Some(session), Some(turn)) => turn == session.player_number,
            _ => false,
        }
    }

    pub fn timer(&self) -> &TimerTracker {
        &self.timer
    }

    pub fn opponent_connected(&self) -> bool {
        self.opponent_connected
    }

    /// Latest user-facing status line.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Outcome of a normally ended game.
    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    /// Apply one event and report what happened.
    pub fn handle(&mut self, event: SessionEvent) -> Transition {
        let from = self.state;
        let name = event.name();
        let (effect, anomaly) = match event {
            SessionEvent::PlayRequested => (self.on_play(), None),
            SessionEvent::TransportOpened => self.on_opened(),
            SessionEvent::Message(message) => (None, self.on_message(message)),
            SessionEvent::TransportClosed { kind, code, reason } => {
                self.on_closed(kind, code, &reason);
                (None, None)
            }
            SessionEvent::TransportFailed { reason } => {
                self.on_failed(&reason);
                (None, None)
            }
            SessionEvent::ReturnToLobby => (self.on_return_to_lobby(), None),
            SessionEvent::WaitTimedOut => (self.on_wait_timed_out(), None),
        };

        if let Some(anomaly) = &anomaly {
            warn!(state = %from, event = name, %anomaly, "protocol anomaly");
        }
        if from != self.state {
            info!(from = %from, to = %self.state, event = name, "session transition");
        }

        Transition {
            from,
            to: self.state,
            effect,
            anomaly,
        }
    }

    fn unexpected(&self, event: &'static str) -> Option<Anomaly> {
        Some(Anomaly::UnexpectedEvent {
            state: self.state,
            event,
        })
    }

    fn on_play(&mut self) -> Option<Effect> {
        if self.state != SessionState::Idle {
            debug!(state = %self.state, "play ignored, session already active");
            return None;
        }
        self.discard_session();
        self.status = None;
        self.state = SessionState::Connecting;
        Some(Effect::OpenConnection)
    }

    fn on_opened(&mut self) -> (Option<Effect>, Option<Anomaly>) {
        if self.state != SessionState::Connecting {
            return (None, self.unexpected("transport opened"));
        }
        self.state = SessionState::WaitingForOpponent;
        self.status = Some(STATUS_WAITING.to_string());
        (None, None)
    }

    fn on_message(&mut self, message: ServerMessage) -> Option<Anomaly> {
        let kind = message.kind();
        match message {
            ServerMessage::TimerUpdate { elapsed } => match self.state {
                // The server's ticker can race its GAME_OVER.
                SessionState::WaitingForOpponent
                | SessionState::InProgress
                | SessionState::EndedNormally
                | SessionState::EndedAbnormally => {
                    self.timer.update(elapsed);
                    None
                }
                SessionState::Idle | SessionState::Connecting => {
                    debug!(state = %self.state, elapsed, "timer update ignored");
                    None
                }
            },
            ServerMessage::GameStart(start) => self.on_game_start(start),
            ServerMessage::Move(made) => self.on_move(made),
            ServerMessage::GameOver { message, reason } => {
                if self.state != SessionState::InProgress {
                    return self.unexpected(kind);
                }
                info!(message = %message, reason = ?reason, "game over");
                self.result = Some(GameResult { message, reason });
                self.turn = None;
                self.status = Some(STATUS_GAME_FINISHED.to_string());
                self.state = SessionState::EndedNormally;
                None
            }
            ServerMessage::OpponentDisconnected { message } => {
                if self.state != SessionState::InProgress {
                    return self.unexpected(kind);
                }
                self.opponent_connected = false;
                self.status = Some(message);
                None
            }
            ServerMessage::OpponentReconnected(payload) => self.on_reconnected(payload),
            ServerMessage::Unknown => None,
        }
    }

    fn on_game_start(&mut self, start: GameStart) -> Option<Anomaly> {
        match self.state {
            SessionState::WaitingForOpponent => {
                let anomaly = self.load_snapshot(&start.board);
                self.session = Some(Session::from_start(&start));
                self.turn = Some(start.starting_player);
                self.opponent_connected = true;
                self.result = None;
                self.status = None;
                self.state = SessionState::InProgress;
                info!(
                    game_id = %start.game_id,
                    player = start.player_number.number(),
                    starting = start.starting_player.number(),
                    "game started"
                );
                anomaly
            }
            SessionState::InProgress
                if self.session.as_ref().map(|s| s.game_id.as_str())
                    == Some(start.game_id.as_str()) =>
            {
                let snapshot_anomaly = self.load_snapshot(&start.board);
                self.turn = Some(start.starting_player);
                snapshot_anomaly.or(Some(Anomaly::Resync {
                    game_id: start.game_id,
                }))
            }
            _ => self.unexpected("GAME_START"),
        }
    }

    fn on_move(&mut self, made: MoveMade) -> Option<Anomaly> {
        if self.state != SessionState::InProgress {
            // Ended boards stay frozen.
            return self.unexpected("MOVE");
        }

        let applied = self.board.apply_move(made.row, made.col, made.player);
        self.turn = Some(made.next_turn);
        debug!(
            player = made.player.number(),
            row = made.row,
            col = made.col,
            next_turn = made.next_turn.number(),
            "move received"
        );
        applied.err().map(|error| Anomaly::InvalidMove {
            row: made.row,
            col: made.col,
            error,
        })
    }

    fn on_reconnected(&mut self, payload: OpponentReconnected) -> Option<Anomaly> {
        if self.state != SessionState::InProgress {
            return self.unexpected("OPPONENT_RECONNECTED");
        }

        let anomaly = match &payload.board {
            Some(snapshot) => self.load_snapshot(snapshot),
            None => {
                debug!("reconnect carried no snapshot, keeping local board");
                None
            }
        };
        if let Some(session) = self.session.as_mut() {
            if let Some(name) = payload.player1_name {
                session.player1_name = name;
            }
            if let Some(name) = payload.player2_name {
                session.player2_name = name;
            }
        }
        self.turn = Some(payload.next_turn);
        self.opponent_connected = true;
        self.status = Some(payload.message);
        anomaly
    }

    fn on_closed(&mut self, kind: CloseKind, code: Option<u16>, reason: &str) {
        if kind == CloseKind::Intentional {
            debug!(state = %self.state, ?code, "intentional close acknowledged");
            return;
        }
        match self.state {
            SessionState::InProgress => {
                self.state = SessionState::EndedAbnormally;
                self.status = Some(STATUS_CONNECTION_LOST.to_string());
            }
            SessionState::Connecting | SessionState::WaitingForOpponent => {
                self.discard_session();
                self.state = SessionState::Idle;
                self.status = Some(if reason.is_empty() {
                    "Connection closed before a match started.".to_string()
                } else {
                    format!("Connection closed before a match started: {reason}")
                });
            }
            SessionState::Idle | SessionState::EndedNormally | SessionState::EndedAbnormally => {
                debug!(state = %self.state, ?code, "close after session end");
            }
        }
    }

    fn on_failed(&mut self, reason: &str) {
        match self.state {
            SessionState::InProgress => {
                self.state = SessionState::EndedAbnormally;
                self.status = Some(format!("Connection lost: {reason}"));
            }
            SessionState::Connecting | SessionState::WaitingForOpponent => {
                self.discard_session();
                self.state = SessionState::Idle;
                self.status = Some(format!("Could not reach the game server: {reason}"));
            }
            SessionState::Idle | SessionState::EndedNormally | SessionState::EndedAbnormally => {
                debug!(state = %self.state, reason, "transport failure after session end");
            }
        }
    }

    fn on_return_to_lobby(&mut self) -> Option<Effect> {
        let status = match self.state {
            SessionState::EndedNormally | SessionState::EndedAbnormally => STATUS_WELCOME_BACK,
            SessionState::Connecting | SessionState::WaitingForOpponent => "Matchmaking cancelled.",
            SessionState::Idle | SessionState::InProgress => {
                debug!(state = %self.state, "return to lobby ignored");
                return None;
            }
        };
        self.discard_session();
        self.state = SessionState::Idle;
        self.status = Some(status.to_string());
        Some(Effect::CloseConnection {
            code: NORMAL_CLOSURE,
            reason: LOBBY_RETURN_REASON.to_string(),
        })
    }

    fn on_wait_timed_out(&mut self) -> Option<Effect> {
        if !self.state.is_matchmaking() {
            debug!(state = %self.state, "wait timeout ignored");
            return None;
        }
        self.discard_session();
        self.state = SessionState::Idle;
        self.status = Some(STATUS_NO_OPPONENT.to_string());
        Some(Effect::CloseConnection {
            code: NORMAL_CLOSURE,
            reason: WAIT_TIMEOUT_REASON.to_string(),
        })
    }

    /// Replace the board with a snapshot; a malformed snapshot leaves it as is.
    fn load_snapshot(&mut self, snapshot: &[Vec<Cell>]) -> Option<Anomaly> {
        match Board::from_rows(snapshot) {
            Ok(board) => {
                self.board.reset(board);
                None
            }
            Err(error) => Some(Anomaly::InvalidSnapshot(error)),
        }
    }

    fn discard_session(&mut self) {
        self.session = None;
        self.board = Board::new();
        self.turn = None;
        self.timer.clear();
        self.opponent_connected = false;
        self.result = None;
    }
}

use tracing::{debug, warn};

use super::machine::SessionMachine;
use super::state::SessionState;
use crate::error::ConnectionError;
use crate::protocol::ClientMessage;

/// Anything that can carry an outbound message to the server.
pub trait MessageSink {
    fn send(&mut self, message: &ClientMessage) -> Result<(), ConnectionError>;
}

/// What became of a column selection.
#[derive(Debug)]
pub enum MoveOutcome {
    Sent,
    /// No game in progress.
    Inactive,
    NotYourTurn,
    ColumnFull,
    InvalidColumn,
    SendFailed(ConnectionError),
}

impl MoveOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, MoveOutcome::Sent)
    }
}

/// Turn a column selection into a `MOVE` request.
///
/// Only validates locally; the board is left alone until the server
/// confirms the placement.
pub fn submit_move<S>(machine: &SessionMachine, sink: &mut S, col: usize) -> MoveOutcome
where
    S: MessageSink + ?Sized,
{
    if machine.state() != SessionState::InProgress {
        return MoveOutcome::Inactive;
    }
    let Some(session) = machine.session() else {
        return MoveOutcome::Inactive;
    };
    if !machine.is_my_turn() {
        return MoveOutcome::NotYourTurn;
    }

    let board = machine.board();
    if col >= board.cols() {
        return MoveOutcome::InvalidColumn;
    }
    if board.find_lowest_empty_row(col).is_none() {
        return MoveOutcome::ColumnFull;
    }

    let message = ClientMessage::Move {
        col,
        player: session.player_number,
    };
    match sink.send(&message) {
        Ok(()) => {
            debug!(col, player = session.player_number.number(), "move sent");
            MoveOutcome::Sent
        }
        Err(e) => {
            warn!(col, error = %e, "failed to send move");
            MoveOutcome::SendFailed(e)
        }
    }
}

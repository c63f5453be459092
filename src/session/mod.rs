//! Session lifecycle: the state machine that owns the board and turn, the
//! move intent check, and the elapsed-time display.

mod intent;
mod machine;
mod state;
mod timer;

pub use intent::{submit_move, MessageSink, MoveOutcome};
pub use machine::{
    Anomaly, Effect, SessionEvent, SessionMachine, Transition, LOBBY_RETURN_REASON,
    STATUS_CONNECTION_LOST, STATUS_GAME_FINISHED, STATUS_NO_OPPONENT, STATUS_WAITING,
    STATUS_WELCOME_BACK, WAIT_TIMEOUT_REASON,
};
pub use state::{GameResult, Session, SessionState};
pub use timer::{format_elapsed, TimerTracker};

use std::fmt;

use crate::game::Player;
use crate::protocol::GameStart;

/// Lifecycle of a play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    WaitingForOpponent,
    InProgress,
    EndedNormally,
    EndedAbnormally,
}

impl SessionState {
    /// True for both ended states.
    pub fn is_ended(self) -> bool {
        matches!(self, SessionState::EndedNormally | SessionState::EndedAbnormally)
    }

    /// True while a channel is being opened or is waiting for a match.
    pub fn is_matchmaking(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::WaitingForOpponent)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "IDLE",
            SessionState::Connecting => "CONNECTING",
            SessionState::WaitingForOpponent => "WAITING_FOR_OPPONENT",
            SessionState::InProgress => "IN_PROGRESS",
            SessionState::EndedNormally => "ENDED_NORMALLY",
            SessionState::EndedAbnormally => "ENDED_ABNORMALLY",
        };
        f.write_str(name)
    }
}

/// One match, created from `GAME_START` and dropped on return to the lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub game_id: String,
    pub player_number: Player,
    pub starting_player: Player,
    pub player1_name: String,
    pub player2_name: String,
}

impl Session {
    pub fn from_start(start: &GameStart) -> Self {
        Session {
            game_id: start.game_id.clone(),
            player_number: start.player_number,
            starting_player: start.starting_player,
            player1_name: start.player1_name.clone(),
            player2_name: start.player2_name.clone(),
        }
    }

    /// Display name of the given seat.
    pub fn name_of(&self, player: Player) -> &str {
        match player {
            Player::One => &self.player1_name,
            Player::Two => &self.player2_name,
        }
    }

    pub fn local_name(&self) -> &str {
        self.name_of(self.player_number)
    }

    pub fn opponent_name(&self) -> &str {
        self.name_of(self.player_number.other())
    }
}

/// How a normally ended game was reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub message: String,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(SessionState::EndedNormally.is_ended());
        assert!(SessionState::EndedAbnormally.is_ended());
        assert!(!SessionState::InProgress.is_ended());
        assert!(SessionState::Connecting.is_matchmaking());
        assert!(SessionState::WaitingForOpponent.is_matchmaking());
        assert!(!SessionState::Idle.is_matchmaking());
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::WaitingForOpponent.to_string(), "WAITING_FOR_OPPONENT");
        assert_eq!(SessionState::EndedAbnormally.to_string(), "ENDED_ABNORMALLY");
    }

    #[test]
    fn test_session_names() {
        let session = Session {
            game_id: "g1".to_string(),
            player_number: Player::Two,
            starting_player: Player::One,
            player1_name: "alice".to_string(),
            player2_name: "bob".to_string(),
        };
        assert_eq!(session.local_name(), "bob");
        assert_eq!(session.opponent_name(), "alice");
        assert_eq!(session.name_of(Player::One), "alice");
    }
}

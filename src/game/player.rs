use serde::{Deserialize, Serialize};

use super::board::Cell;

/// One of the two seats in a match, numbered 1 and 2 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Map a wire player number to a player.
    pub fn from_number(number: u8) -> Option<Player> {
        match number {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    /// The wire player number.
    pub fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    /// Get the other player
    pub fn other(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Convert player to cell type
    pub fn to_cell(self) -> Cell {
        match self {
            Player::One => Cell::PlayerOne,
            Player::Two => Cell::PlayerTwo,
        }
    }

    /// Disc colour name for display
    pub fn name(self) -> &'static str {
        match self {
            Player::One => "Yellow",
            Player::Two => "Red",
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Player::from_number(number).ok_or_else(|| format!("invalid player number {number}"))
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        player.number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_player() {
        assert_eq!(Player::One.other(), Player::Two);
        assert_eq!(Player::Two.other(), Player::One);
    }

    #[test]
    fn test_player_name() {
        assert_eq!(Player::One.name(), "Yellow");
        assert_eq!(Player::Two.name(), "Red");
    }

    #[test]
    fn test_from_number() {
        assert_eq!(Player::from_number(1), Some(Player::One));
        assert_eq!(Player::from_number(2), Some(Player::Two));
        assert_eq!(Player::from_number(0), None);
        assert_eq!(Player::from_number(3), None);
    }

    #[test]
    fn test_serde_uses_wire_number() {
        assert_eq!(serde_json::to_string(&Player::Two).unwrap(), "2");
        let player: Player = serde_json::from_str("1").unwrap();
        assert_eq!(player, Player::One);
        assert!(serde_json::from_str::<Player>("5").is_err());
    }
}

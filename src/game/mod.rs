//! Client-side Connect Four board model: cells, players, and a grid that is
//! only ever changed by server-confirmed moves or full snapshots.

mod board;
mod player;

pub use board::{Board, Cell, COLS, ROWS};
pub use player::Player;

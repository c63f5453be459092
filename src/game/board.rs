use serde::{Deserialize, Serialize};

use super::Player;
use crate::error::BoardError;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// Contents of a single board position, numbered 0/1/2 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Cell {
    Empty,
    PlayerOne,
    PlayerTwo,
}

impl TryFrom<u8> for Cell {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Cell::Empty),
            1 => Ok(Cell::PlayerOne),
            2 => Ok(Cell::PlayerTwo),
            other => Err(format!("invalid cell value {other}")),
        }
    }
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> u8 {
        match cell {
            Cell::Empty => 0,
            Cell::PlayerOne => 1,
            Cell::PlayerTwo => 2,
        }
    }
}

/// Client-side mirror of the server's grid.
///
/// The board never decides where a disc lands: placements come from the
/// server with an explicit row, and a snapshot can replace the whole grid.
/// Row 0 is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create a new empty 6x7 board
    pub fn new() -> Self {
        Self::with_dimensions(ROWS, COLS)
    }

    /// Create an empty board with the given dimensions.
    pub fn with_dimensions(rows: usize, cols: usize) -> Self {
        Board {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    /// Build a board from a row-major snapshot as sent by the server.
    pub fn from_rows(snapshot: &[Vec<Cell>]) -> Result<Self, BoardError> {
        let rows = snapshot.len();
        let cols = snapshot.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(BoardError::EmptySnapshot);
        }

        let mut cells = Vec::with_capacity(rows * cols);
        for (row, line) in snapshot.iter().enumerate() {
            if line.len() != cols {
                return Err(BoardError::RaggedSnapshot {
                    row,
                    expected: cols,
                    found: line.len(),
                });
            }
            cells.extend_from_slice(line);
        }

        Ok(Board { rows, cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get the cell at a specific position, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.index(row, col).map(|i| self.cells[i])
    }

    /// Place the player's disc at a server-assigned position.
    ///
    /// Only bounds and occupancy are checked; legality is the server's call.
    pub fn apply_move(&mut self, row: usize, col: usize, player: Player) -> Result<(), BoardError> {
        let index = self.index(row, col).ok_or(BoardError::OutOfBounds {
            row,
            col,
            rows: self.rows,
            cols: self.cols,
        })?;

        if self.cells[index] != Cell::Empty {
            return Err(BoardError::Occupied { row, col });
        }

        self.cells[index] = player.to_cell();
        Ok(())
    }

    /// Replace the entire grid, dimensions included, with an authoritative snapshot.
    pub fn reset(&mut self, snapshot: Board) {
        *self = snapshot;
    }

    /// Row index of the lowest empty cell in a column, `None` if the column
    /// is full or does not exist.
    pub fn find_lowest_empty_row(&self, col: usize) -> Option<usize> {
        if col >= self.cols {
            return None;
        }
        (0..self.rows)
            .rev()
            .find(|&row| self.cells[row * self.cols + col] == Cell::Empty)
    }

    /// Number of discs on the board.
    pub fn disc_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != Cell::Empty).count()
    }

    /// Row-major copy of the grid in wire layout.
    pub fn to_rows(&self) -> Vec<Vec<Cell>> {
        self.cells.chunks(self.cols).map(<[Cell]>::to_vec).collect()
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{DuelError, Result};

/// Number of rows and columns on the board
pub const GRID_SIZE: usize = 4;
/// Total number of cells on the board
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

#[derive(Debug, Clone, Copy, Serialize, Hash, Eq, PartialEq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Check if two positions are adjacent (including diagonals)
    pub fn is_adjacent(&self, other: &Position) -> bool {
        let row_diff = self.row.abs_diff(other.row);
        let col_diff = self.col.abs_diff(other.col);

        row_diff <= 1 && col_diff <= 1 && (row_diff + col_diff > 0)
    }

    /// All in-bounds cells touching this one, diagonals included
    pub fn neighbours(self) -> impl Iterator<Item = Position> {
        Grid::positions().filter(move |pos| self.is_adjacent(pos))
    }
}

/// A 4x4 board of uppercase letters, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    cells: [[char; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    /// Build a grid from letters that are already known to be uppercase ASCII
    pub(crate) fn from_cells(cells: [[char; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { cells }
    }

    /// Parse a 16-letter row-major layout such as `"CATSDOGSBIRDFISH"`.
    ///
    /// Letters are case-insensitive and stored uppercase. Any other length
    /// or a non-letter character is an `InvalidLayout` error.
    pub fn from_layout(layout: &str) -> Result<Self> {
        let invalid = |reason: String| DuelError::InvalidLayout {
            layout: layout.to_string(),
            reason,
        };

        let count = layout.chars().count();
        if count != CELL_COUNT {
            return Err(invalid(format!(
                "expected {} letters, got {}",
                CELL_COUNT, count
            )));
        }

        let mut cells = [[' '; GRID_SIZE]; GRID_SIZE];
        for (index, ch) in layout.chars().enumerate() {
            if !ch.is_ascii_alphabetic() {
                return Err(invalid(format!("{:?} is not a letter", ch)));
            }
            cells[index / GRID_SIZE][index % GRID_SIZE] = ch.to_ascii_uppercase();
        }

        Ok(Self { cells })
    }

    pub fn letter(&self, pos: Position) -> char {
        self.cells[pos.row][pos.col]
    }

    /// Every cell position in row-major order
    pub fn positions() -> impl Iterator<Item = Position> {
        (0..CELL_COUNT).map(|i| Position::new(i / GRID_SIZE, i % GRID_SIZE))
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for ch in row {
                write!(f, "{}", ch)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Grid {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_layout(s)
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub mod grid;

pub use grid::{Grid, Position, CELL_COUNT, GRID_SIZE};

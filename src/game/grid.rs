use rand::{seq::SliceRandom, Rng};

use crate::{
    models::{Grid, GRID_SIZE},
    utils::dice::{Die, DICE, FACES},
};

pub struct GridGenerator;

impl GridGenerator {
    /// Generate a new 4x4 grid by shaking the standard dice
    pub fn generate() -> Grid {
        Self::generate_with(&mut rand::rng())
    }

    /// Shuffle the dice into the 16 cells, then roll each one in place
    pub fn generate_with(rng: &mut impl Rng) -> Grid {
        let mut dice: Vec<Die> = DICE.to_vec();
        dice.shuffle(rng);

        let mut cells = [[' '; GRID_SIZE]; GRID_SIZE];
        for (index, die) in dice.iter().enumerate() {
            cells[index / GRID_SIZE][index % GRID_SIZE] = Self::roll(die, rng);
        }

        Grid::from_cells(cells)
    }

    fn roll(die: &Die, rng: &mut impl Rng) -> char {
        die[rng.random_range(0..FACES)]
    }
}

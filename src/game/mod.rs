// Board generation, word search and scoring

pub mod grid;
pub mod validator;
pub mod scorer;

pub use grid::GridGenerator;
pub use validator::{PathFinder, Verdict, WordValidator, MIN_WORD_LENGTH};
pub use scorer::Scorer;

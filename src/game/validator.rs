use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    dictionary::Dictionary,
    models::{Grid, Position, GRID_SIZE},
};

/// Shortest word that can score
pub const MIN_WORD_LENGTH: usize = 3;

type Visited = [[bool; GRID_SIZE]; GRID_SIZE];

/// Depth-first search for words traced through adjacent, unused cells.
///
/// A board `Q` followed by a `U` in the word first tries the `U` as implied
/// (no cell needed); if that fails the same start is retried requiring an
/// explicit adjacent `U` cell. The implied attempt consumes exactly one `U`,
/// so `QUU...` needs one `U` on the board next to the `Q`.
pub struct PathFinder;

impl PathFinder {
    /// Whether `word` can be traced on `grid`. The empty word always can.
    pub fn can_form(grid: &Grid, word: &str) -> bool {
        Self::find_path(grid, word).is_some()
    }

    /// The cells of one tracing of `word`, or `None` if there is none.
    ///
    /// An implied `U` has no cell, so the path can be shorter than the word.
    pub fn find_path(grid: &Grid, word: &str) -> Option<Vec<Position>> {
        let letters: Vec<char> = word.chars().map(|c| c.to_ascii_uppercase()).collect();
        if letters.is_empty() {
            return Some(Vec::new());
        }

        Grid::positions().find_map(|start| {
            let mut visited: Visited = [[false; GRID_SIZE]; GRID_SIZE];
            let mut path = Vec::with_capacity(letters.len());
            Self::trace(grid, start, &letters, &mut visited, &mut path).then_some(path)
        })
    }

    fn trace(
        grid: &Grid,
        pos: Position,
        suffix: &[char],
        visited: &mut Visited,
        path: &mut Vec<Position>,
    ) -> bool {
        if visited[pos.row][pos.col] || grid.letter(pos) != suffix[0] {
            return false;
        }

        visited[pos.row][pos.col] = true;
        path.push(pos);

        let rest = &suffix[1..];
        if suffix[0] == 'Q'
            && rest.first() == Some(&'U')
            && Self::extend(grid, pos, &rest[1..], visited, path)
        {
            return true;
        }
        if Self::extend(grid, pos, rest, visited, path) {
            return true;
        }

        visited[pos.row][pos.col] = false;
        path.pop();
        false
    }

    fn extend(
        grid: &Grid,
        pos: Position,
        rest: &[char],
        visited: &mut Visited,
        path: &mut Vec<Position>,
    ) -> bool {
        rest.is_empty()
            || pos
                .neighbours()
                .any(|next| Self::trace(grid, next, rest, visited, path))
    }
}

/// Outcome of checking one submitted word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    TooShort,
    NotInDictionary,
    NotOnBoard,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }
}

/// Combines the shared dictionary with path search
#[derive(Debug, Clone)]
pub struct WordValidator {
    dictionary: Arc<Dictionary>,
}

impl WordValidator {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self { dictionary }
    }

    /// Check if word exists in dictionary
    pub fn is_valid_word(&self, word: &str) -> bool {
        self.dictionary.contains(word)
    }

    pub fn judge(&self, grid: &Grid, word: &str) -> Verdict {
        if word.chars().count() < MIN_WORD_LENGTH {
            Verdict::TooShort
        } else if !self.is_valid_word(word) {
            Verdict::NotInDictionary
        } else if !PathFinder::can_form(grid, word) {
            Verdict::NotOnBoard
        } else {
            Verdict::Accepted
        }
    }

    /// Every dictionary word long enough to score that can be traced on `grid`
    pub fn formable_words(&self, grid: &Grid) -> BTreeSet<String> {
        self.dictionary
            .iter()
            .filter(|word| word.len() >= MIN_WORD_LENGTH)
            .filter(|word| PathFinder::can_form(grid, word))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn grid(layout: &str) -> Grid {
        Grid::from_layout(layout).unwrap()
    }

    #[test]
    fn test_empty_word_is_formable() {
        assert!(PathFinder::can_form(&grid("ABCDEFGHIJKLMNOP"), ""));
        assert_eq!(PathFinder::find_path(&grid("ABCDEFGHIJKLMNOP"), ""), Some(vec![]));
    }

    #[test]
    fn test_straight_and_diagonal_paths() {
        // A B C D
        // E F G H
        // I J K L
        // M N O P
        let board = grid("ABCDEFGHIJKLMNOP");
        assert!(PathFinder::can_form(&board, "abcd"));
        assert!(PathFinder::can_form(&board, "AFKP"));
        assert!(PathFinder::can_form(&board, "PLHD"));
        assert!(PathFinder::can_form(&board, "GJM"));
        assert!(!PathFinder::can_form(&board, "AC"));
        assert!(!PathFinder::can_form(&board, "AP"));
        assert!(!PathFinder::can_form(&board, "Z"));
    }

    #[test]
    fn test_cells_are_not_reused() {
        // Only one A, so ABA would need to revisit it.
        let board = grid("ABCDEFGHIJKLMNOP");
        assert!(!PathFinder::can_form(&board, "ABA"));
        assert!(!PathFinder::can_form(&board, "FF"));

        // Two As next to the B make it traceable.
        let board = grid("ABAXXXXXXXXXXXXX");
        assert!(PathFinder::can_form(&board, "ABA"));
    }

    #[test]
    fn test_backtracks_out_of_dead_ends() {
        // C A X X
        // A X X X
        // T X X X
        // X X X X
        // The A at (0,1) is a dead end for CAT; the A at (1,0) is not.
        let board = grid("CAXXAXXXTXXXXXXX");
        let path = PathFinder::find_path(&board, "CAT").unwrap();
        assert_eq!(
            path,
            vec![Position::new(0, 0), Position::new(1, 0), Position::new(2, 0)]
        );
    }

    #[test]
    fn test_found_paths_are_valid() {
        // S E R S
        // P A T G
        // L I N E
        // S E R S
        let board = grid("SERSPATGLINESERS");
        for word in ["SERS", "PATS", "LINES", "STAR"] {
            let path = PathFinder::find_path(&board, word)
                .unwrap_or_else(|| panic!("{} should be traceable", word));

            assert!(path.windows(2).all(|pair| pair[0].is_adjacent(&pair[1])));
            let distinct: HashSet<_> = path.iter().collect();
            assert_eq!(distinct.len(), path.len(), "cell reused for {}", word);
            let traced: String = path.iter().map(|pos| board.letter(*pos)).collect();
            assert_eq!(traced, word);
        }
        // G and A are not adjacent.
        assert!(PathFinder::find_path(&board, "GATE").is_none());
    }

    #[test]
    fn test_search_does_not_mutate_grid() {
        let board = grid("QUITSTOPCATSDOGS");
        let before = board.clone();
        let _ = PathFinder::can_form(&board, "QUITS");
        let _ = PathFinder::can_form(&board, "NOPE");
        assert_eq!(board, before);
    }

    #[test]
    fn test_q_with_implied_u() {
        // Q I T X
        // X X X X
        // X X X X
        // X X X X
        let board = grid("QITXXXXXXXXXXXXX");
        assert!(PathFinder::can_form(&board, "QUIT"));
        let path = PathFinder::find_path(&board, "QUIT").unwrap();
        assert_eq!(path.len(), 3);
        assert!(!PathFinder::can_form(&board, "QUITE"));
    }

    #[test]
    fn test_q_with_explicit_u() {
        // Q U I T
        let board = grid("QUITXXXXXXXXXXXX");
        assert!(PathFinder::can_form(&board, "QUIT"));
        // Q U X A  -> U must be used as a cell because X is not next to Q
        let board = grid("QUXABBBBBBBBBBBB");
        assert!(PathFinder::can_form(&board, "QUX"));
    }

    #[test]
    fn test_q_followed_by_double_u() {
        // Q U X A: implied U takes the first U, the board U takes the second.
        let board = grid("QUXABBBBBBBBBBBB");
        assert!(PathFinder::can_form(&board, "QUUX"));
        // With no U on the board only one U can be implied.
        let board = grid("QXAABBBBBBBBBBBB");
        assert!(PathFinder::can_form(&board, "QUX"));
        assert!(!PathFinder::can_form(&board, "QUUX"));
    }

    #[test]
    fn test_u_is_only_implied_after_q() {
        let board = grid("AITXXXXXXXXXXXXX");
        assert!(!PathFinder::can_form(&board, "AUIT"));
    }

    #[test]
    fn test_judge_verdicts() {
        let validator = WordValidator::new(Arc::new(Dictionary::from_words([
            "CAT", "DOG", "AT",
        ])));
        let board = grid("CATXXXXXXXXXXXXX");

        assert_eq!(validator.judge(&board, "cat"), Verdict::Accepted);
        assert_eq!(validator.judge(&board, "AT"), Verdict::TooShort);
        assert_eq!(validator.judge(&board, "TAC"), Verdict::NotInDictionary);
        assert_eq!(validator.judge(&board, "DOG"), Verdict::NotOnBoard);
    }

    #[test]
    fn test_formable_words() {
        let validator = WordValidator::new(Arc::new(Dictionary::from_words([
            "CAT", "ACT", "TAX", "DOG", "AT", "QUIT",
        ])));
        let board = grid("CATXXXXXXXXXXXXX");
        let found: Vec<String> = validator.formable_words(&board).into_iter().collect();
        assert_eq!(found, vec!["CAT", "TAX"]);
    }
}

use once_cell::sync::Lazy;

use crate::models::CELL_COUNT;

/// Faces per die
pub const FACES: usize = 6;

/// A six-sided letter die
pub type Die = [char; FACES];

/// The sixteen standard letter dice, one per board cell.
///
/// The Q face stands for "QU" during word search.
pub static DICE: Lazy<[Die; CELL_COUNT]> = Lazy::new(|| {
    [
        "AAEEGN", "ABBJOO", "ACHOPS", "AFFKPS", "AOOTTW", "CIMOTU", "DEILRX", "DELRVY",
        "DISTTY", "EEGHNW", "EEINSU", "EHRTVW", "EIOSST", "ELRTTY", "HIMNQU", "HLNNRZ",
    ]
    .map(to_die)
});

fn to_die(faces: &str) -> Die {
    let mut die = ['A'; FACES];
    for (slot, ch) in die.iter_mut().zip(faces.chars()) {
        *slot = ch;
    }
    die
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_die_has_six_letter_faces() {
        for die in DICE.iter() {
            assert!(die.iter().all(|c| c.is_ascii_uppercase()));
        }
        assert_eq!(DICE.len(), 16);
    }

    #[test]
    fn test_q_is_rollable() {
        assert!(DICE.iter().any(|die| die.contains(&'Q')));
    }
}

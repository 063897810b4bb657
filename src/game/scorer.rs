use crate::game::validator::MIN_WORD_LENGTH;

pub struct Scorer;

impl Scorer {
    /// Point value of an accepted word, by length.
    ///
    /// - 3 or 4 letters: 1
    /// - 5 letters: 2
    /// - 6 letters: 3
    /// - 7 letters: 5
    /// - 8 or more: 11
    pub fn word_value(word: &str) -> i32 {
        match word.chars().count() {
            n if n < MIN_WORD_LENGTH => 0,
            3 | 4 => 1,
            5 => 2,
            6 => 3,
            7 => 5,
            _ => 11,
        }
    }

    /// Penalty for submitting a word that is not accepted
    pub fn rejection_penalty() -> i32 {
        1
    }

    /// Sum of the values of a set of words
    pub fn total<'a, I>(words: I) -> i32
    where
        I: IntoIterator<Item = &'a String>,
    {
        words.into_iter().map(|word| Self::word_value(word)).sum()
    }
}

//! Letter values: A=1 through Z=26

/// Value of a single grid letter. Empty cells are worth 0.
///
/// Letters reaching the engine are already uppercase (see [`normalize_letter`]),
/// so anything outside `A..=Z` is treated like an empty cell.
pub fn letter_value(letter: Option<char>) -> u32 {
    match letter {
        Some(c @ 'A'..='Z') => c as u32 - 'A' as u32 + 1,
        _ => 0,
    }
}

/// Coerce raw input to a grid letter (uppercase ASCII), or `None` if the
/// character cannot go in the grid.
pub fn normalize_letter(input: char) -> Option<char> {
    let upper = input.to_ascii_uppercase();
    upper.is_ascii_uppercase().then_some(upper)
}

/// Total letter value of a word
pub fn word_value(word: &str) -> u32 {
    word.chars().map(|c| letter_value(Some(c))).sum()
}

/// Whether `word` is exactly `len` uppercase letters
pub(crate) fn is_upper_word(word: &str, len: usize) -> bool {
    word.chars().count() == len && word.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_values() {
        assert_eq!(letter_value(Some('A')), 1);
        assert_eq!(letter_value(Some('M')), 13);
        assert_eq!(letter_value(Some('Z')), 26);
        assert_eq!(letter_value(None), 0);
    }

    #[test]
    fn test_non_letters_are_worth_nothing() {
        assert_eq!(letter_value(Some('a')), 0);
        assert_eq!(letter_value(Some('7')), 0);
    }

    #[test]
    fn test_normalize_letter() {
        assert_eq!(normalize_letter('q'), Some('Q'));
        assert_eq!(normalize_letter('Q'), Some('Q'));
        assert_eq!(normalize_letter('1'), None);
        assert_eq!(normalize_letter(' '), None);
        assert_eq!(normalize_letter('é'), None);
    }

    #[test]
    fn test_word_value() {
        assert_eq!(word_value("SNOWDRIFT"), 128);
        assert_eq!(word_value("SOFT"), 19 + 15 + 6 + 20);
    }
}

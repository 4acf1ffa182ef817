//! Grid validation: sums, corner words, completion and reveal gating
//!
//! Everything here is a pure function of a [`GridState`] and a
//! [`PuzzleDefinition`]. The grid is tiny, so callers simply recompute a
//! full [`ValidationSnapshot`] after every edit.

use crate::grid::{Corner, GridState, SIZE};
use crate::letter::letter_value;
use crate::puzzle::{PuzzleDefinition, SOLUTION_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display state of a row or column sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SumStatus {
    /// Nothing entered yet, shown neutrally
    Pending,
    /// Sum equals the target
    Matched,
    /// Something entered but the sum is off
    Mismatched,
}

impl SumStatus {
    pub fn of(actual: u32, target: u32) -> Self {
        if actual == target {
            SumStatus::Matched
        } else if actual == 0 {
            SumStatus::Pending
        } else {
            SumStatus::Mismatched
        }
    }

    pub fn is_matched(&self) -> bool {
        *self == SumStatus::Matched
    }
}

/// Result of checking a typed solution word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordCheck {
    Correct,
    Incorrect,
    /// Not a full-length guess yet; feedback should be cleared
    Indeterminate,
}

/// Why a reveal was refused. Checked in declaration order, first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevealDenied {
    UnfilledCells,
    SumsIncorrect,
    CornersInvalid,
}

impl fmt::Display for RevealDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnfilledCells => write!(f, "Please fill in all grid cells first!"),
            Self::SumsIncorrect => write!(
                f,
                "Grid sums don't match the targets. Keep working on the arrangement!"
            ),
            Self::CornersInvalid => {
                write!(f, "Not all corners contain valid words from the given set!")
            }
        }
    }
}

/// True iff all four letters are present and are an anagram of `word`.
///
/// This is exact multiset equality: a corner holding `OFTS` matches `SOFT`,
/// but `SOFF` does not, and a partially filled corner never matches.
pub fn letters_form_word(letters: &[Option<char>; 4], word: &str) -> bool {
    let mut corner: Vec<char> = Vec::with_capacity(4);
    for letter in letters {
        match letter {
            Some(c) => corner.push(*c),
            None => return false,
        }
    }

    let mut target: Vec<char> = word.chars().collect();
    if target.len() != corner.len() {
        return false;
    }
    corner.sort_unstable();
    target.sort_unstable();
    corner == target
}

/// Whether a corner's letters spell any of the given words
pub fn corner_matches<'w>(
    letters: &[Option<char>; 4],
    given_words: impl IntoIterator<Item = &'w str>,
) -> bool {
    given_words
        .into_iter()
        .any(|word| letters_form_word(letters, word))
}

/// Everything the UI needs to render after an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSnapshot {
    pub row_sums: [u32; SIZE],
    pub col_sums: [u32; SIZE],
    pub row_statuses: [SumStatus; SIZE],
    pub col_statuses: [SumStatus; SIZE],
    /// Indexed like [`Corner::ALL`]
    pub corner_validity: [bool; 4],
    pub grid_complete: bool,
}

impl ValidationSnapshot {
    pub fn corner_valid(&self, corner: Corner) -> bool {
        let index = Corner::ALL
            .iter()
            .position(|c| *c == corner)
            .unwrap_or_default();
        self.corner_validity[index]
    }
}

/// Read-only view that evaluates a grid against a puzzle
#[derive(Debug, Clone, Copy)]
pub struct ValidationEngine<'a> {
    grid: &'a GridState,
    puzzle: &'a PuzzleDefinition,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(grid: &'a GridState, puzzle: &'a PuzzleDefinition) -> Self {
        Self { grid, puzzle }
    }

    pub fn row_sum(&self, row: usize) -> u32 {
        self.grid.row(row).into_iter().map(letter_value).sum()
    }

    pub fn col_sum(&self, col: usize) -> u32 {
        self.grid.column(col).into_iter().map(letter_value).sum()
    }

    /// Status of one row. Rows past the grid have no letters and no
    /// target, so they stay `Pending` like their sum stays 0.
    pub fn row_status(&self, row: usize) -> SumStatus {
        match self.puzzle.row_targets().get(row) {
            Some(&target) => SumStatus::of(self.row_sum(row), target),
            None => SumStatus::Pending,
        }
    }

    pub fn col_status(&self, col: usize) -> SumStatus {
        match self.puzzle.col_targets().get(col) {
            Some(&target) => SumStatus::of(self.col_sum(col), target),
            None => SumStatus::Pending,
        }
    }

    pub fn corner_letters(&self, corner: Corner) -> [Option<char>; 4] {
        self.grid.corner(corner)
    }

    pub fn corner_matches(&self, corner: Corner) -> bool {
        corner_matches(&self.corner_letters(corner), self.puzzle.given_words())
    }

    pub fn all_sums_correct(&self) -> bool {
        (0..SIZE).all(|i| self.row_status(i).is_matched() && self.col_status(i).is_matched())
    }

    pub fn all_corners_valid(&self) -> bool {
        Corner::ALL.iter().all(|c| self.corner_matches(*c))
    }

    /// Solved through the grid constraints alone
    pub fn is_grid_complete(&self) -> bool {
        self.all_sums_correct() && self.all_corners_valid()
    }

    /// Compare a typed guess with the solution. Input is uppercased and
    /// trimmed; anything other than a full 9-letter guess is indeterminate.
    pub fn check_final_word(&self, candidate: &str) -> WordCheck {
        let guess = candidate.trim().to_uppercase();
        if guess.chars().count() != SOLUTION_LEN {
            return WordCheck::Indeterminate;
        }
        if guess == self.puzzle.solution() {
            WordCheck::Correct
        } else {
            WordCheck::Incorrect
        }
    }

    /// The solution word, but only once the grid has earned it
    pub fn reveal(&self) -> Result<&'a str, RevealDenied> {
        if !self.grid.is_full() {
            return Err(RevealDenied::UnfilledCells);
        }
        if !self.all_sums_correct() {
            return Err(RevealDenied::SumsIncorrect);
        }
        if !self.all_corners_valid() {
            return Err(RevealDenied::CornersInvalid);
        }
        Ok(self.puzzle.solution())
    }

    pub fn snapshot(&self) -> ValidationSnapshot {
        let row_sums: [u32; SIZE] = std::array::from_fn(|r| self.row_sum(r));
        let col_sums: [u32; SIZE] = std::array::from_fn(|c| self.col_sum(c));
        let rows = self.puzzle.row_targets();
        let cols = self.puzzle.col_targets();
        let row_statuses = std::array::from_fn(|r| SumStatus::of(row_sums[r], rows[r]));
        let col_statuses = std::array::from_fn(|c| SumStatus::of(col_sums[c], cols[c]));
        let corner_validity = Corner::ALL.map(|c| self.corner_matches(c));

        let grid_complete = row_statuses.iter().all(SumStatus::is_matched)
            && col_statuses.iter().all(SumStatus::is_matched)
            && corner_validity.iter().all(|v| *v);

        ValidationSnapshot {
            row_sums,
            col_sums,
            row_statuses,
            col_statuses,
            corner_validity,
            grid_complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLVED: &str = "FTISORDNW";

    fn snowdrift() -> PuzzleDefinition {
        PuzzleDefinition::new(
            [35, 52, 41],
            [29, 49, 50],
            &["SOFT", "RIOT", "WORN", "NODS"],
            "SNOWDRIFT",
        )
        .unwrap()
    }

    fn grid(s: &str) -> GridState {
        GridState::from_string(s).unwrap()
    }

    #[test]
    fn test_sum_status() {
        assert_eq!(SumStatus::of(0, 35), SumStatus::Pending);
        assert_eq!(SumStatus::of(35, 35), SumStatus::Matched);
        assert_eq!(SumStatus::of(12, 35), SumStatus::Mismatched);
        assert_eq!(SumStatus::of(40, 35), SumStatus::Mismatched);
    }

    #[test]
    fn test_sums_over_every_line() {
        let puzzle = snowdrift();
        let grids = ["SNOWDRIFT", SOLVED, ".........", "A...B...C", "Z.Z.Z.Z.Z"];
        for s in grids {
            let g = grid(s);
            let engine = ValidationEngine::new(&g, &puzzle);
            for i in 0..SIZE {
                let row: u32 = g.row(i).into_iter().map(letter_value).sum();
                let col: u32 = g.column(i).into_iter().map(letter_value).sum();
                assert_eq!(engine.row_sum(i), row, "row {} of {}", i, s);
                assert_eq!(engine.col_sum(i), col, "col {} of {}", i, s);
            }
        }
    }

    #[test]
    fn test_lines_past_the_grid_are_pending() {
        let puzzle = snowdrift();
        let g = grid(SOLVED);
        let engine = ValidationEngine::new(&g, &puzzle);
        assert_eq!(engine.row_status(2), SumStatus::Matched);
        for i in [SIZE, SIZE + 4, usize::MAX] {
            assert_eq!(engine.row_sum(i), 0);
            assert_eq!(engine.col_sum(i), 0);
            assert_eq!(engine.row_status(i), SumStatus::Pending);
            assert_eq!(engine.col_status(i), SumStatus::Pending);
        }
    }

    #[test]
    fn test_snowdrift_in_reading_order_is_wrong() {
        let puzzle = snowdrift();
        let g = grid("SNOWDRIFT");
        let engine = ValidationEngine::new(&g, &puzzle);

        assert_eq!([engine.row_sum(0), engine.row_sum(1), engine.row_sum(2)], [48, 45, 35]);
        assert_eq!(engine.row_status(0), SumStatus::Mismatched);
        assert!(!engine.is_grid_complete());
        assert_eq!(engine.reveal(), Err(RevealDenied::SumsIncorrect));
    }

    #[test]
    fn test_solved_arrangement() {
        let puzzle = snowdrift();
        let g = grid(SOLVED);
        let engine = ValidationEngine::new(&g, &puzzle);

        assert!(engine.all_sums_correct());
        assert!(engine.all_corners_valid());
        assert!(engine.is_grid_complete());
        assert_eq!(engine.reveal(), Ok("SNOWDRIFT"));

        let snap = engine.snapshot();
        assert!(snap.grid_complete);
        assert_eq!(snap.row_sums, [35, 52, 41]);
        assert_eq!(snap.col_sums, [29, 49, 50]);
        assert_eq!(snap.corner_validity, [true; 4]);
    }

    #[test]
    fn test_corner_is_anagram_not_positional() {
        // TL reads F,T,S,O which is SOFT reordered
        let letters = [Some('F'), Some('T'), Some('S'), Some('O')];
        assert!(letters_form_word(&letters, "SOFT"));
        assert!(!letters_form_word(&letters, "RIOT"));
    }

    #[test]
    fn test_corner_needs_exact_multiset() {
        assert!(!letters_form_word(&[Some('S'), Some('O'), Some('F'), Some('F')], "SOFT"));
        assert!(!letters_form_word(&[Some('S'), Some('O'), Some('F'), None], "SOFT"));
        assert!(!letters_form_word(&[None; 4], "SOFT"));
        assert!(!corner_matches(&[None; 4], ["SOFT", "RIOT"]));
        assert!(corner_matches(&[Some('T'), Some('O'), Some('I'), Some('R')], ["SOFT", "RIOT"]));
    }

    #[test]
    fn test_single_cell_change_breaks_completion() {
        let puzzle = snowdrift();
        for index in 0..9 {
            let mut g = grid(SOLVED);
            let original = g.get(index).unwrap();
            let replacement = if original == 'A' { 'B' } else { 'A' };
            g.set_letter(index, Some(replacement));
            let engine = ValidationEngine::new(&g, &puzzle);
            assert!(!engine.is_grid_complete(), "changing cell {} kept it complete", index);
            assert_eq!(
                engine.is_grid_complete(),
                engine.all_sums_correct() && engine.all_corners_valid()
            );
        }
    }

    #[test]
    fn test_reveal_precedence() {
        let puzzle = snowdrift();

        let empty = GridState::new();
        let engine = ValidationEngine::new(&empty, &puzzle);
        assert_eq!(engine.reveal(), Err(RevealDenied::UnfilledCells));

        let partial = grid("FTISORDN.");
        let engine = ValidationEngine::new(&partial, &puzzle);
        assert_eq!(engine.reveal(), Err(RevealDenied::UnfilledCells));

        // Same sums and solution, but NODE replaces NODS so bottom-left fails
        let other = PuzzleDefinition::new(
            [35, 52, 41],
            [29, 49, 50],
            &["SOFT", "RIOT", "WORN", "NODE"],
            "SNOWDRIFT",
        )
        .unwrap();
        let solved = grid(SOLVED);
        let engine = ValidationEngine::new(&solved, &other);
        assert!(engine.all_sums_correct());
        assert!(!engine.corner_matches(Corner::BottomLeft));
        assert_eq!(engine.reveal(), Err(RevealDenied::CornersInvalid));
    }

    #[test]
    fn test_check_final_word() {
        let puzzle = snowdrift();
        let g = GridState::new();
        let engine = ValidationEngine::new(&g, &puzzle);

        assert_eq!(engine.check_final_word("snowdrift"), WordCheck::Correct);
        assert_eq!(engine.check_final_word("SNOWDRIFT"), WordCheck::Correct);
        assert_eq!(engine.check_final_word("SNOWDRAFT"), WordCheck::Incorrect);
        assert_eq!(engine.check_final_word("SNOW"), WordCheck::Indeterminate);
        assert_eq!(engine.check_final_word(""), WordCheck::Indeterminate);
    }

    #[test]
    fn test_snapshot_pending_on_empty_grid() {
        let puzzle = snowdrift();
        let g = GridState::new();
        let snap = ValidationEngine::new(&g, &puzzle).snapshot();
        assert_eq!(snap.row_statuses, [SumStatus::Pending; 3]);
        assert_eq!(snap.col_statuses, [SumStatus::Pending; 3]);
        assert_eq!(snap.corner_validity, [false; 4]);
        assert!(!snap.grid_complete);
        assert!(!snap.corner_valid(Corner::TopRight));
    }
}

//! The 3x3 letter grid and its four overlapping corners

use crate::letter::normalize_letter;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid side length
pub const SIZE: usize = 3;
/// Number of cells in the grid
pub const CELLS: usize = SIZE * SIZE;

/// Placeholder used for empty cells in the compact string form
const EMPTY_CHAR: char = '.';

/// One of the four 2x2 sub-grids. Neighbouring corners share two cells and
/// all four share the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Row-major cell indices covered by this corner
    pub fn cells(&self) -> [usize; 4] {
        match self {
            Corner::TopLeft => [0, 1, 3, 4],
            Corner::TopRight => [1, 2, 4, 5],
            Corner::BottomLeft => [3, 4, 6, 7],
            Corner::BottomRight => [4, 5, 7, 8],
        }
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Corner::TopLeft => "TL",
            Corner::TopRight => "TR",
            Corner::BottomLeft => "BL",
            Corner::BottomRight => "BR",
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single-cell edit coming from the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEdit {
    /// Row-major cell index (0-8)
    pub index: usize,
    /// New letter, or `None` to clear the cell
    pub letter: Option<char>,
}

impl CellEdit {
    pub fn set(index: usize, letter: char) -> Self {
        Self {
            index,
            letter: Some(letter),
        }
    }

    pub fn clear(index: usize) -> Self {
        Self {
            index,
            letter: None,
        }
    }
}

/// Player letters, row-major (index = row * 3 + col)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GridState {
    cells: [Option<char>; CELLS],
}

impl GridState {
    /// An empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the compact form: 9 characters, letters or `.` for empty.
    /// Lowercase letters are accepted and uppercased.
    pub fn from_string(s: &str) -> Option<Self> {
        let chars: Vec<char> = s.trim().chars().collect();
        if chars.len() != CELLS {
            return None;
        }

        let mut grid = Self::new();
        for (i, c) in chars.into_iter().enumerate() {
            if c == EMPTY_CHAR || c == ' ' {
                continue;
            }
            grid.cells[i] = Some(normalize_letter(c)?);
        }
        Some(grid)
    }

    /// Compact form, `.` for empty cells
    pub fn to_string_compact(&self) -> String {
        self.cells.iter().map(|c| c.unwrap_or(EMPTY_CHAR)).collect()
    }

    /// Letter at a cell index (None if empty or out of range)
    pub fn get(&self, index: usize) -> Option<char> {
        self.cells.get(index).copied().flatten()
    }

    /// Letter at (row, col)
    pub fn at(&self, row: usize, col: usize) -> Option<char> {
        if row >= SIZE || col >= SIZE {
            return None;
        }
        self.get(row * SIZE + col)
    }

    /// Set or clear one cell. Input is coerced to uppercase.
    ///
    /// Returns false (and leaves the grid untouched) for an out-of-range
    /// index or a character that is not a letter.
    pub fn set_letter(&mut self, index: usize, letter: Option<char>) -> bool {
        if index >= CELLS {
            return false;
        }
        let value = match letter {
            Some(c) => match normalize_letter(c) {
                Some(upper) => Some(upper),
                None => return false,
            },
            None => None,
        };
        self.cells[index] = value;
        true
    }

    /// Apply an edit event
    pub fn apply(&mut self, edit: CellEdit) -> bool {
        self.set_letter(edit.index, edit.letter)
    }

    /// Clear every cell
    pub fn clear(&mut self) {
        self.cells = [None; CELLS];
    }

    pub fn cells(&self) -> &[Option<char>; CELLS] {
        &self.cells
    }

    pub fn row(&self, row: usize) -> [Option<char>; SIZE] {
        std::array::from_fn(|col| self.at(row, col))
    }

    pub fn column(&self, col: usize) -> [Option<char>; SIZE] {
        std::array::from_fn(|row| self.at(row, col))
    }

    /// The four letters of a corner, in row-major order
    pub fn corner(&self, corner: Corner) -> [Option<char>; 4] {
        corner.cells().map(|i| self.cells[i])
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }

    pub fn is_full(&self) -> bool {
        self.filled_count() == CELLS
    }
}

impl fmt::Display for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..SIZE {
            let line: Vec<String> = self
                .row(row)
                .iter()
                .map(|c| c.unwrap_or(EMPTY_CHAR).to_string())
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

impl From<GridState> for String {
    fn from(grid: GridState) -> Self {
        grid.to_string_compact()
    }
}

impl TryFrom<String> for GridState {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        GridState::from_string(&s).ok_or_else(|| format!("invalid grid snapshot: {:?}", s))
    }
}

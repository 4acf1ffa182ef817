//! Puzzle definitions and the weekly puzzle feed format
//!
//! The feed delivers one entry per date:
//!
//! ```json
//! { "date": "2025-06-01", "level": "CL",
//!   "puzzle": { "words": [{ "word": "SOFT", "letters": [...], "values": [...] }],
//!               "targets": { "rows": [35, 52, 41], "cols": [29, 49, 50] },
//!               "solution": "SNOWDRIFT" } }
//! ```
//!
//! The body may also arrive under `puzzle-data`, sometimes wrapped a second
//! time. Bodies are converted into a [`PuzzleDefinition`] only after every
//! load check passes.

use crate::grid::SIZE;
use crate::letter::{is_upper_word, letter_value, word_value};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of given words per puzzle
pub const GIVEN_WORDS: usize = 4;
/// Length of each given word
pub const WORD_LEN: usize = 4;
/// Length of the solution word
pub const SOLUTION_LEN: usize = 9;

/// Reasons a puzzle cannot be activated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuzzleLoadError {
    #[error("puzzle has no targets")]
    MissingTargets,
    #[error("expected 3 {axis} targets, found {found}")]
    TargetCount { axis: &'static str, found: usize },
    #[error("{axis} target {value} is outside 3-78")]
    TargetOutOfRange { axis: &'static str, value: u32 },
    #[error("row targets sum to {rows} but column targets sum to {cols}")]
    UnbalancedTargets { rows: u32, cols: u32 },
    #[error("expected 4 given words, found {0}")]
    WordCount(usize),
    #[error("given word {0:?} is not 4 letters A-Z")]
    BadWord(String),
    #[error("solution {0:?} is not 9 letters A-Z")]
    BadSolution(String),
    #[error("solution letters sum to {solution} but targets sum to {targets}")]
    SolutionSumMismatch { solution: u32, targets: u32 },
    #[error("puzzle feed is not valid JSON: {0}")]
    Parse(String),
    #[error("puzzle feed contains no puzzles")]
    EmptyFeed,
}

/// A given word plus its per-letter values, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordClue {
    pub word: String,
    #[serde(default)]
    pub letters: Vec<String>,
    #[serde(default)]
    pub values: Vec<u32>,
}

impl WordClue {
    /// Build a clue from a bare word, deriving letters and values
    pub fn from_word(word: &str) -> Self {
        let word = word.to_ascii_uppercase();
        Self {
            letters: word.chars().map(|c| c.to_string()).collect(),
            values: word.chars().map(|c| letter_value(Some(c))).collect(),
            word,
        }
    }
}

/// Row and column targets as they appear in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targets {
    #[serde(default)]
    pub rows: Vec<u32>,
    #[serde(default)]
    pub cols: Vec<u32>,
}

/// Puzzle body exactly as delivered, before any checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPuzzle {
    #[serde(default)]
    pub words: Vec<WordClue>,
    #[serde(default)]
    pub targets: Option<Targets>,
    #[serde(default)]
    pub solution: String,
    /// Some feeds wrap the body one level deeper
    #[serde(rename = "puzzle-data", default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<RawPuzzle>>,
}

impl RawPuzzle {
    /// The innermost body
    pub fn body(&self) -> &RawPuzzle {
        match self.nested {
            Some(ref inner) => inner.body(),
            None => self,
        }
    }
}

/// One day's immutable puzzle. Only constructed through the load checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PuzzleDefinition {
    row_targets: [u32; SIZE],
    col_targets: [u32; SIZE],
    words: Vec<WordClue>,
    solution: String,
}

impl PuzzleDefinition {
    /// Build a definition from bare values, running every load check
    pub fn new(
        row_targets: [u32; SIZE],
        col_targets: [u32; SIZE],
        given_words: &[&str],
        solution: &str,
    ) -> Result<Self, PuzzleLoadError> {
        let raw = RawPuzzle {
            words: given_words.iter().map(|w| WordClue::from_word(w)).collect(),
            targets: Some(Targets {
                rows: row_targets.to_vec(),
                cols: col_targets.to_vec(),
            }),
            solution: solution.to_string(),
            nested: None,
        };
        Self::try_from(&raw)
    }

    pub fn row_targets(&self) -> [u32; SIZE] {
        self.row_targets
    }

    pub fn col_targets(&self) -> [u32; SIZE] {
        self.col_targets
    }

    /// Word clues in feed order
    pub fn words(&self) -> &[WordClue] {
        &self.words
    }

    /// The four given words
    pub fn given_words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|w| w.word.as_str())
    }

    pub fn solution(&self) -> &str {
        &self.solution
    }

    /// Sum of all row targets (equal to the column total and the solution value)
    pub fn total(&self) -> u32 {
        self.row_targets.iter().sum()
    }
}

/// Three letters sum to at least 3 (AAA) and at most 78 (ZZZ)
const LINE_TARGETS: std::ops::RangeInclusive<u32> = 3..=78;

fn targets_array(values: &[u32], axis: &'static str) -> Result<[u32; SIZE], PuzzleLoadError> {
    let targets = <[u32; SIZE]>::try_from(values).map_err(|_| PuzzleLoadError::TargetCount {
        axis,
        found: values.len(),
    })?;
    match targets.iter().find(|t| !LINE_TARGETS.contains(t)) {
        Some(&value) => Err(PuzzleLoadError::TargetOutOfRange { axis, value }),
        None => Ok(targets),
    }
}

impl TryFrom<&RawPuzzle> for PuzzleDefinition {
    type Error = PuzzleLoadError;

    fn try_from(raw: &RawPuzzle) -> Result<Self, Self::Error> {
        let body = raw.body();

        let targets = body.targets.as_ref().ok_or(PuzzleLoadError::MissingTargets)?;
        let row_targets = targets_array(&targets.rows, "row")?;
        let col_targets = targets_array(&targets.cols, "column")?;

        let rows: u32 = row_targets.iter().sum();
        let cols: u32 = col_targets.iter().sum();
        if rows != cols {
            return Err(PuzzleLoadError::UnbalancedTargets { rows, cols });
        }

        if body.words.len() != GIVEN_WORDS {
            return Err(PuzzleLoadError::WordCount(body.words.len()));
        }
        let mut words = Vec::with_capacity(GIVEN_WORDS);
        for clue in &body.words {
            let word = clue.word.trim().to_ascii_uppercase();
            if !is_upper_word(&word, WORD_LEN) {
                return Err(PuzzleLoadError::BadWord(clue.word.clone()));
            }
            words.push(WordClue::from_word(&word));
        }

        let solution = body.solution.trim().to_ascii_uppercase();
        if !is_upper_word(&solution, SOLUTION_LEN) {
            return Err(PuzzleLoadError::BadSolution(body.solution.clone()));
        }
        let solution_sum = word_value(&solution);
        if solution_sum != rows {
            return Err(PuzzleLoadError::SolutionSumMismatch {
                solution: solution_sum,
                targets: rows,
            });
        }

        Ok(Self {
            row_targets,
            col_targets,
            words,
            solution,
        })
    }
}

/// One dated entry of the weekly feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPuzzle {
    /// ISO date (YYYY-MM-DD)
    pub date: String,
    #[serde(default)]
    pub level: String,
    #[serde(alias = "puzzle-data")]
    pub puzzle: RawPuzzle,
}

impl DailyPuzzle {
    /// Checked definition for this date
    pub fn definition(&self) -> Result<PuzzleDefinition, PuzzleLoadError> {
        PuzzleDefinition::try_from(&self.puzzle)
    }
}

/// The weekly feed: newest puzzle first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPuzzles {
    pub puzzles: Vec<DailyPuzzle>,
}

impl WeeklyPuzzles {
    /// Parse a feed document. Only the JSON shape is checked here; each
    /// entry is validated when its date is activated.
    pub fn from_json(json: &str) -> Result<Self, PuzzleLoadError> {
        let feed: Self =
            serde_json::from_str(json).map_err(|e| PuzzleLoadError::Parse(e.to_string()))?;
        if feed.puzzles.is_empty() {
            return Err(PuzzleLoadError::EmptyFeed);
        }
        Ok(feed)
    }

    /// Built-in puzzles used when no feed is available: four days ending
    /// at `today`, newest first.
    pub fn fallback(today: NaiveDate) -> Self {
        let puzzles = (0..4)
            .map(|days_back| DailyPuzzle {
                date: (today - Duration::days(days_back))
                    .format("%Y-%m-%d")
                    .to_string(),
                level: "CL".to_string(),
                puzzle: snowdrift(),
            })
            .collect();
        Self { puzzles }
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DailyPuzzle> {
        self.puzzles.get(index)
    }

    /// Index of the entry for `date`
    pub fn position(&self, date: &str) -> Option<usize> {
        self.puzzles.iter().position(|p| p.date == date)
    }
}

fn snowdrift() -> RawPuzzle {
    RawPuzzle {
        words: ["SOFT", "RIOT", "WORN", "NODS"]
            .iter()
            .map(|w| WordClue::from_word(w))
            .collect(),
        targets: Some(Targets {
            rows: vec![35, 52, 41],
            cols: vec![29, 49, 50],
        }),
        solution: "SNOWDRIFT".to_string(),
        nested: None,
    }
}

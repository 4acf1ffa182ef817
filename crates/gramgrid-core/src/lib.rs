//! GramGrid puzzle engine
//!
//! A daily word-arithmetic puzzle: fill a 3x3 grid so that every row and
//! column sums to its target (A=1 .. Z=26) and each overlapping 2x2 corner
//! is an anagram of one of four given words. The nine letters also spell
//! the day's solution word.
//!
//! - [`validation`] checks a grid against a [`PuzzleDefinition`]
//! - [`session`] drives one date's play through `Empty -> InProgress -> Solved`
//! - [`progress`] remembers per-date work and durable completions on top
//!   of a [`persistence`] backend

pub mod grid;
pub mod letter;
pub mod persistence;
pub mod progress;
pub mod puzzle;
pub mod session;
pub mod validation;

pub use grid::{CellEdit, Corner, GridState};
pub use letter::{letter_value, normalize_letter};
pub use persistence::{
    create_adapter, data_dir, Environment, FileStore, MemoryStore, PersistenceAdapter,
    PersistenceError,
};
pub use progress::{
    now_millis, CompletionMeta, CompletionRecord, PersistOutcome, ProgressStore, PuzzleState,
    SessionRecord, SESSION_MAX_AGE,
};
pub use puzzle::{DailyPuzzle, PuzzleDefinition, PuzzleLoadError, WeeklyPuzzles, WordClue};
pub use session::{EditOutcome, PuzzleSession, PuzzleStatus};
pub use validation::{RevealDenied, SumStatus, ValidationEngine, ValidationSnapshot, WordCheck};

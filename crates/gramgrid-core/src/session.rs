//! One date's play session: grid, timer and the solve state machine
//!
//! `Empty -> InProgress -> Solved`. Solving happens either when the grid
//! satisfies every constraint or when the player types the solution word.
//! A session reports the solve exactly once, even if the grid is edited
//! afterwards or reset and solved again.

use crate::grid::GridState;
use crate::progress::{now_millis, CompletionMeta, PuzzleState};
use crate::puzzle::PuzzleDefinition;
use crate::validation::{RevealDenied, ValidationEngine, ValidationSnapshot, WordCheck};
use serde::{Deserialize, Serialize};

/// Where a puzzle is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PuzzleStatus {
    Empty,
    InProgress,
    Solved,
}

/// Result of a single cell edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    /// False if the edit was rejected (bad index or non-letter)
    pub applied: bool,
    pub snapshot: ValidationSnapshot,
    pub status: PuzzleStatus,
    /// True only for the edit that first solved the puzzle
    pub newly_solved: bool,
}

/// The active puzzle for one date
#[derive(Debug, Clone)]
pub struct PuzzleSession {
    date: String,
    puzzle: PuzzleDefinition,
    grid: GridState,
    status: PuzzleStatus,
    /// Unix ms of the first letter entered
    start_time: Option<i64>,
    /// Unix ms of the solve
    completion_time: Option<i64>,
    /// Whether the solve has been reported to the caller
    completion_reported: bool,
    /// Whether this date was solved in an earlier run
    previously_completed: bool,
    hints_used: u32,
    /// The solution has been shown; later reveals are free
    revealed: bool,
}

impl PuzzleSession {
    pub fn new(date: &str, puzzle: PuzzleDefinition) -> Self {
        Self {
            date: date.to_string(),
            puzzle,
            grid: GridState::new(),
            status: PuzzleStatus::Empty,
            start_time: None,
            completion_time: None,
            completion_reported: false,
            previously_completed: false,
            hints_used: 0,
            revealed: false,
        }
    }

    /// Rehydrate from what the progress store knows about this date
    pub fn restore(&mut self, state: &PuzzleState) {
        self.grid = state.grid().cloned().unwrap_or_default();
        self.start_time = state.start_time();
        self.completion_time = state.completion_time();
        self.hints_used = state.meta().map(|m| m.hints_used).unwrap_or(0);
        self.revealed = self.hints_used > 0;
        self.previously_completed = state.previously_completed();

        if state.is_completed() {
            self.status = PuzzleStatus::Solved;
            self.completion_reported = true;
        } else {
            self.status = if self.grid.is_empty() {
                PuzzleStatus::Empty
            } else {
                PuzzleStatus::InProgress
            };
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn puzzle(&self) -> &PuzzleDefinition {
        &self.puzzle
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn status(&self) -> PuzzleStatus {
        self.status
    }

    pub fn is_solved(&self) -> bool {
        self.status == PuzzleStatus::Solved
    }

    pub fn previously_completed(&self) -> bool {
        self.previously_completed
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn engine(&self) -> ValidationEngine<'_> {
        ValidationEngine::new(&self.grid, &self.puzzle)
    }

    pub fn snapshot(&self) -> ValidationSnapshot {
        self.engine().snapshot()
    }

    /// Apply one cell edit and re-evaluate everything
    pub fn set_letter(&mut self, index: usize, letter: Option<char>) -> EditOutcome {
        self.set_letter_at(index, letter, now_millis())
    }

    fn set_letter_at(&mut self, index: usize, letter: Option<char>, now: i64) -> EditOutcome {
        let applied = self.grid.set_letter(index, letter);

        if applied && self.status == PuzzleStatus::Empty && !self.grid.is_empty() {
            self.status = PuzzleStatus::InProgress;
            if self.start_time.is_none() {
                self.start_time = Some(now);
            }
        }

        let snapshot = self.snapshot();
        let newly_solved = applied && snapshot.grid_complete && self.mark_solved(now);

        EditOutcome {
            applied,
            snapshot,
            status: self.status,
            newly_solved,
        }
    }

    /// Check a typed solution word. Returns the check and whether this
    /// guess is what solved the puzzle.
    pub fn submit_final_word(&mut self, candidate: &str) -> (WordCheck, bool) {
        let check = self.engine().check_final_word(candidate);
        let newly_solved = check == WordCheck::Correct && self.mark_solved(now_millis());
        (check, newly_solved)
    }

    /// Show the solution once the grid is correct. The first reveal of a
    /// session counts as a hint, repeats do not.
    pub fn reveal(&mut self) -> Result<String, RevealDenied> {
        let solution = self.engine().reveal()?.to_string();
        if !self.revealed {
            self.revealed = true;
            self.hints_used += 1;
        }
        Ok(solution)
    }

    /// Clear the grid and timer. A later solve is not reported again.
    pub fn reset(&mut self) {
        self.grid.clear();
        self.status = PuzzleStatus::Empty;
        self.start_time = None;
        self.completion_time = None;
    }

    /// Seconds between the first letter and the solve (or `now`)
    pub fn elapsed_secs(&self, now: i64) -> u64 {
        let Some(start) = self.start_time else {
            return 0;
        };
        let end = self.completion_time.unwrap_or(now);
        u64::try_from(end.saturating_sub(start) / 1000).unwrap_or(0)
    }

    /// Elapsed time as MM:SS
    pub fn elapsed_string(&self, now: i64) -> String {
        let secs = self.elapsed_secs(now);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    /// Metadata to hand to the progress store on completion
    pub fn completion_meta(&self) -> CompletionMeta {
        CompletionMeta {
            grid: Some(self.grid.clone()),
            hints_used: self.hints_used,
            elapsed_secs: self
                .start_time
                .map(|_| self.elapsed_secs(self.completion_time.unwrap_or_else(now_millis))),
            ..Default::default()
        }
    }

    /// Transition to Solved; true if this is the first report
    fn mark_solved(&mut self, now: i64) -> bool {
        if self.status != PuzzleStatus::Solved {
            self.status = PuzzleStatus::Solved;
            if self.completion_time.is_none() {
                self.completion_time = Some(now);
            }
        }
        if self.completion_reported {
            return false;
        }
        self.completion_reported = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CompletionRecord, SessionRecord};
    use crate::validation::SumStatus;

    const DATE: &str = "2025-06-01";
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

    fn fill(session: &mut PuzzleSession, letters: &str) -> Vec<EditOutcome> {
        letters
            .chars()
            .enumerate()
            .map(|(i, c)| session.set_letter(i, Some(c)))
            .collect()
    }

    #[test]
    fn test_status_transitions() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        assert_eq!(session.status(), PuzzleStatus::Empty);
        assert_eq!(session.start_time(), None);

        let outcome = session.set_letter(0, Some('f'));
        assert!(outcome.applied);
        assert_eq!(outcome.status, PuzzleStatus::InProgress);
        assert!(session.start_time().is_some());
        assert_eq!(session.grid().get(0), Some('F'));

        let outcomes = fill(&mut session, SOLVED);
        let solved: Vec<bool> = outcomes.iter().map(|o| o.newly_solved).collect();
        assert_eq!(solved.iter().filter(|s| **s).count(), 1);
        assert!(outcomes.last().unwrap().newly_solved);
        assert!(session.is_solved());
    }

    #[test]
    fn test_rejected_edit_changes_nothing() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        let outcome = session.set_letter(12, Some('A'));
        assert!(!outcome.applied);
        let outcome = session.set_letter(0, Some('#'));
        assert!(!outcome.applied);
        assert_eq!(session.status(), PuzzleStatus::Empty);
        assert_eq!(outcome.snapshot.row_statuses, [SumStatus::Pending; 3]);
    }

    #[test]
    fn test_reading_order_grid_does_not_solve() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        let outcomes = fill(&mut session, "SNOWDRIFT");
        assert!(outcomes.iter().all(|o| !o.newly_solved));
        assert_eq!(session.status(), PuzzleStatus::InProgress);
        assert_eq!(session.snapshot().row_sums, [48, 45, 35]);
        assert_eq!(session.reveal(), Err(RevealDenied::SumsIncorrect));
        assert_eq!(session.hints_used(), 0);
    }

    #[test]
    fn test_final_word_solves() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        fill(&mut session, SOLVED);
        let mut other = PuzzleSession::new(DATE, snowdrift());
        other.set_letter(0, Some('S'));

        assert_eq!(other.submit_final_word("SNOW"), (WordCheck::Indeterminate, false));
        assert_eq!(other.submit_final_word("SNOWDRAFT"), (WordCheck::Incorrect, false));
        assert_eq!(other.submit_final_word("snowdrift"), (WordCheck::Correct, true));
        assert_eq!(other.status(), PuzzleStatus::Solved);

        // Already solved through the grid, so the word does not re-fire
        assert_eq!(session.submit_final_word("SNOWDRIFT"), (WordCheck::Correct, false));
    }

    #[test]
    fn test_edits_after_solve_do_not_refire() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        fill(&mut session, SOLVED);

        let outcome = session.set_letter(8, None);
        assert!(outcome.applied);
        assert!(!outcome.snapshot.grid_complete);
        assert_eq!(outcome.status, PuzzleStatus::Solved);

        let outcome = session.set_letter(8, Some('W'));
        assert!(outcome.snapshot.grid_complete);
        assert!(!outcome.newly_solved);

        session.reset();
        assert_eq!(session.status(), PuzzleStatus::Empty);
        assert!(session.grid().is_empty());
        let outcomes = fill(&mut session, SOLVED);
        assert!(outcomes.iter().all(|o| !o.newly_solved));
        assert!(session.is_solved());
    }

    #[test]
    fn test_reveal_counts_as_hint() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        assert_eq!(session.reveal(), Err(RevealDenied::UnfilledCells));
        fill(&mut session, SOLVED);
        assert_eq!(session.reveal(), Ok("SNOWDRIFT".to_string()));
        assert_eq!(session.hints_used(), 1);
        assert_eq!(session.completion_meta().hints_used, 1);
    }

    #[test]
    fn test_repeated_reveal_counts_once() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        fill(&mut session, SOLVED);
        for _ in 0..3 {
            assert_eq!(session.reveal(), Ok("SNOWDRIFT".to_string()));
        }
        assert_eq!(session.hints_used(), 1);

        // Still one after a reset and a second solve
        session.reset();
        fill(&mut session, SOLVED);
        assert_eq!(session.reveal(), Ok("SNOWDRIFT".to_string()));
        assert_eq!(session.hints_used(), 1);
    }

    #[test]
    fn test_elapsed_time() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        assert_eq!(session.elapsed_secs(1_000_000), 0);

        session.set_letter_at(0, Some('F'), 1_000);
        assert_eq!(session.elapsed_secs(66_000), 65);
        assert_eq!(session.elapsed_string(66_000), "01:05");

        for (i, c) in SOLVED.chars().enumerate().skip(1) {
            session.set_letter_at(i, Some(c), 31_000);
        }
        assert!(session.is_solved());
        // Clock stops at the solve
        assert_eq!(session.elapsed_secs(500_000), 30);
        assert_eq!(session.completion_meta().elapsed_secs, Some(30));
    }

    #[test]
    fn test_restore_in_progress_session() {
        let record = SessionRecord {
            date: DATE.to_string(),
            grid: GridState::from_string("FT.......").unwrap(),
            completed: false,
            completion_time: None,
            start_time: Some(7),
            updated_at: 8,
            meta: None,
        };
        let mut session = PuzzleSession::new(DATE, snowdrift());
        session.restore(&PuzzleState::Session(record));

        assert_eq!(session.status(), PuzzleStatus::InProgress);
        assert_eq!(session.grid().to_string_compact(), "FT.......");
        assert_eq!(session.start_time(), Some(7));
        assert!(!session.previously_completed());
    }

    #[test]
    fn test_restore_previous_completion() {
        let record = CompletionRecord {
            date: DATE.to_string(),
            completed: true,
            completion_time: 90_000,
            start_time: Some(30_000),
            meta: CompletionMeta {
                grid: GridState::from_string(SOLVED),
                hints_used: 1,
                elapsed_secs: Some(60),
                ..Default::default()
            },
        };
        let mut session = PuzzleSession::new(DATE, snowdrift());
        session.restore(&PuzzleState::PreviouslyCompleted(record));

        assert!(session.is_solved());
        assert!(session.previously_completed());
        assert_eq!(session.grid().to_string_compact(), SOLVED);
        assert_eq!(session.elapsed_secs(1_000_000), 60);
        assert_eq!(session.hints_used(), 1);
        assert!(!session.set_letter(8, Some('W')).newly_solved);
        // Revealed in the earlier run already
        assert!(session.reveal().is_ok());
        assert_eq!(session.hints_used(), 1);
    }

    #[test]
    fn test_restore_stub_keeps_empty_grid() {
        let mut session = PuzzleSession::new(DATE, snowdrift());
        session.restore(&PuzzleState::CompletedStub {
            date: DATE.to_string(),
        });
        assert!(session.is_solved());
        assert!(session.grid().is_empty());
        assert_eq!(session.submit_final_word("SNOWDRIFT"), (WordCheck::Correct, false));
    }
}

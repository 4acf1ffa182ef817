use crate::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gramgrid_core::grid::CELLS;
use gramgrid_core::{
    normalize_letter, now_millis, PersistOutcome, ProgressStore, PuzzleSession, RevealDenied,
    WeeklyPuzzles, WordCheck, SESSION_MAX_AGE,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// How often stale sessions are swept
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Ticks a message stays on screen (~3 seconds at 100ms)
const MESSAGE_TICKS: u32 = 30;

/// Result of handling a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

/// Which input receives typed letters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Grid,
    FinalWord,
}

/// Feedback line under the final-word field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Word(WordCheck),
    Denied(RevealDenied),
}

/// The main application state
pub struct App {
    /// The loaded week, newest first
    pub feed: WeeklyPuzzles,
    /// Index into the feed of the day being played
    pub day: usize,
    /// None when the day's puzzle failed to load
    pub session: Option<PuzzleSession>,
    /// Why the day's puzzle could not be loaded
    pub load_error: Option<String>,
    store: Arc<ProgressStore>,
    runtime: Handle,
    /// Selected cell, 0..9 in reading order
    pub cursor: usize,
    pub focus: Focus,
    /// Contents of the solution word field
    pub final_word: String,
    pub feedback: Option<Feedback>,
    pub theme: Theme,
    /// Message to display
    pub message: Option<String>,
    message_timer: u32,
    last_sweep: Instant,
    /// Raised by background writes that failed
    save_failed: Arc<AtomicBool>,
    /// Background writes not yet known to be finished
    pending: Vec<JoinHandle<()>>,
}

impl App {
    /// Create the app and open `start` (an index into the feed)
    pub fn new(feed: WeeklyPuzzles, start: usize, store: Arc<ProgressStore>, runtime: Handle) -> Self {
        let mut app = Self {
            feed,
            day: start,
            session: None,
            load_error: None,
            store,
            runtime,
            cursor: 0,
            focus: Focus::Grid,
            final_word: String::new(),
            feedback: None,
            theme: Theme::dark(),
            message: None,
            message_timer: 0,
            last_sweep: Instant::now(),
            save_failed: Arc::new(AtomicBool::new(false)),
            pending: Vec::new(),
        };
        app.open_day(start);
        app
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(100)
    }

    /// Update timers (called every tick)
    pub fn tick(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message = None;
            }
        }

        if self.save_failed.swap(false, Ordering::Relaxed) {
            self.show_message("Progress not saved");
        }

        self.pending.retain(|task| !task.is_finished());

        if self.last_sweep.elapsed() >= SWEEP_INTERVAL {
            self.store.sweep_stale_sessions(SESSION_MAX_AGE);
            self.last_sweep = Instant::now();
        }
    }

    /// Show a temporary message
    pub fn show_message(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
        self.message_timer = MESSAGE_TICKS;
    }

    /// Date of the day being played
    pub fn date(&self) -> Option<&str> {
        self.feed.get(self.day).map(|p| p.date.as_str())
    }

    pub fn is_completed(&self, date: &str) -> bool {
        self.store.is_completed(date)
    }

    pub fn elapsed_string(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.elapsed_string(now_millis()))
            .unwrap_or_else(|| "00:00".to_string())
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.handle_control_key(key.code);
        }

        match key.code {
            KeyCode::Esc => return AppAction::Quit,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Grid => Focus::FinalWord,
                    Focus::FinalWord => Focus::Grid,
                };
            }
            _ if self.session.is_none() => {}
            _ => match self.focus {
                Focus::Grid => self.handle_grid_key(key.code),
                Focus::FinalWord => self.handle_word_key(key.code),
            },
        }
        AppAction::Continue
    }

    fn handle_control_key(&mut self, code: KeyCode) -> AppAction {
        match code {
            KeyCode::Char('c') => return AppAction::Quit,
            KeyCode::Char('r') => self.reset(),
            KeyCode::Char('v') => self.reveal(),
            // Feed is newest first: previous day is further down the list
            KeyCode::Char('p') => self.change_day(1),
            KeyCode::Char('n') => self.change_day(-1),
            KeyCode::Char('t') => self.theme = self.theme.toggled(),
            _ => {}
        }
        AppAction::Continue
    }

    fn handle_grid_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.move_cursor(-1, 0),
            KeyCode::Down => self.move_cursor(1, 0),
            KeyCode::Left => self.move_cursor(0, -1),
            KeyCode::Right => self.move_cursor(0, 1),
            KeyCode::Enter => self.cursor = (self.cursor + 1) % CELLS,
            KeyCode::Char(c) => match normalize_letter(c) {
                Some(letter) => {
                    self.edit(Some(letter));
                    self.cursor = (self.cursor + 1) % CELLS;
                }
                None => self.show_message("Letters A-Z only"),
            },
            KeyCode::Backspace => {
                let filled = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.grid().get(self.cursor).is_some());
                if !filled && self.cursor > 0 {
                    self.cursor -= 1;
                }
                self.edit(None);
            }
            KeyCode::Delete => self.edit(None),
            _ => {}
        }
    }

    fn handle_word_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => {
                if let Some(letter) = normalize_letter(c) {
                    if self.final_word.len() < gramgrid_core::puzzle::SOLUTION_LEN {
                        self.final_word.push(letter);
                    }
                }
            }
            KeyCode::Backspace => {
                self.final_word.pop();
                self.feedback = None;
            }
            KeyCode::Enter => self.submit_word(),
            _ => {}
        }
    }

    fn move_cursor(&mut self, row_delta: i32, col_delta: i32) {
        let row = (self.cursor / 3) as i32;
        let col = (self.cursor % 3) as i32;
        let new_row = (row + row_delta).clamp(0, 2) as usize;
        let new_col = (col + col_delta).clamp(0, 2) as usize;
        self.cursor = new_row * 3 + new_col;
    }

    /// Set or clear the cell under the cursor
    fn edit(&mut self, letter: Option<char>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let outcome = session.set_letter(self.cursor, letter);
        if !outcome.applied {
            return;
        }
        self.feedback = None;
        self.save_session();
        if outcome.newly_solved {
            self.on_solved();
        }
    }

    fn submit_word(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let (check, newly_solved) = session.submit_final_word(&self.final_word);
        self.feedback = Some(Feedback::Word(check));
        if newly_solved {
            self.save_session();
            self.on_solved();
        }
    }

    fn reveal(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let hints_before = session.hints_used();
        match session.reveal() {
            Ok(word) => {
                let counted = session.hints_used() != hints_before;
                let meta = session.completion_meta();
                let date = session.date().to_string();
                self.final_word = word;
                self.feedback = None;
                // Only the first reveal changes the stored hint count
                if counted && self.store.update_completion_meta(&date, meta) {
                    self.persist_in_background();
                }
            }
            Err(denied) => self.feedback = Some(Feedback::Denied(denied)),
        }
    }

    fn reset(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.reset();
        self.cursor = 0;
        self.focus = Focus::Grid;
        self.final_word.clear();
        self.feedback = None;
        self.save_session();
        self.show_message("Puzzle reset");
    }

    fn change_day(&mut self, delta: isize) {
        let Some(target) = self.day.checked_add_signed(delta) else {
            self.show_message("No newer puzzle");
            return;
        };
        if target >= self.feed.len() {
            self.show_message("No older puzzle");
            return;
        }
        self.open_day(target);
        if let Some(date) = self.date() {
            let msg = format!("Puzzle for {}", date);
            self.show_message(&msg);
        }
    }

    /// Leave the current day and rehydrate `day` from the store
    fn open_day(&mut self, day: usize) {
        if self.session.as_ref().is_some_and(|s| s.start_time().is_some()) {
            self.save_session();
        }

        self.day = day;
        self.cursor = 0;
        self.focus = Focus::Grid;
        self.final_word.clear();
        self.feedback = None;

        let Some(entry) = self.feed.get(day) else {
            self.session = None;
            self.load_error = Some("No puzzle for this day".to_string());
            return;
        };

        match entry.definition() {
            Ok(puzzle) => {
                let mut session = PuzzleSession::new(&entry.date, puzzle);
                if let Some(state) = self.store.get_puzzle_state(&entry.date) {
                    session.restore(&state);
                }
                log::debug!("Opened {} ({:?})", entry.date, session.status());
                self.session = Some(session);
                self.load_error = None;
            }
            Err(e) => {
                log::warn!("Puzzle for {} failed to load: {}", entry.date, e);
                self.session = None;
                self.load_error = Some(e.to_string());
            }
        }
    }

    fn save_session(&self) {
        if let Some(session) = &self.session {
            self.store
                .save_session_state(session.date(), session.grid().clone(), session.start_time());
        }
    }

    /// Record the solve now and write it out without blocking input
    fn on_solved(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        self.store
            .record_completion(session.date(), session.completion_meta());
        let msg = format!("Solved in {}!", self.elapsed_string());
        self.persist_in_background();
        self.show_message(&msg);
    }

    fn persist_in_background(&mut self) {
        let store = Arc::clone(&self.store);
        let failed = Arc::clone(&self.save_failed);
        let task = self.runtime.spawn(async move {
            if let PersistOutcome::PersistFailed(errors) = store.persist_completions().await {
                log::warn!("{} completion writes failed", errors.len());
                failed.store(true, Ordering::Relaxed);
            }
        });
        self.pending.push(task);
    }

    /// Hand over unfinished writes so they can be awaited before exit
    pub fn take_pending(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramgrid_core::{MemoryStore, PuzzleStatus};

    const SOLVED: &str = "FTISORDNW";

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn today() -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
    }

    fn app(backend: Arc<MemoryStore>) -> App {
        let store = Arc::new(ProgressStore::new(backend));
        App::new(WeeklyPuzzles::fallback(today()), 0, store, Handle::current())
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn test_typing_fills_grid_and_advances() {
        let mut app = app(Arc::new(MemoryStore::new()));
        type_str(&mut app, "ft");
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.grid().to_string_compact(), "FT.......");
        assert_eq!(session.status(), PuzzleStatus::InProgress);
        assert_eq!(app.cursor, 2);

        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.cursor, 1);
        assert_eq!(app.session.as_ref().unwrap().grid().get(1), None);
        assert!(app.store.has_session_work("2025-06-04"));
    }

    #[tokio::test]
    async fn test_solving_grid_persists_completion() {
        let backend = Arc::new(MemoryStore::new());
        let mut app = app(backend.clone());
        type_str(&mut app, SOLVED);

        assert!(app.session.as_ref().unwrap().is_solved());
        assert!(app.is_completed("2025-06-04"));

        // Write happens on the runtime; wait for it through the store's lock
        let _ = app.store.persist_completions().await;
        assert!(backend.peek(gramgrid_core::progress::COMPLETIONS_KEY).is_some());
    }

    #[tokio::test]
    async fn test_reveal_fills_final_word() {
        let mut app = app(Arc::new(MemoryStore::new()));
        app.handle_key(ctrl('v'));
        assert_eq!(app.feedback, Some(Feedback::Denied(RevealDenied::UnfilledCells)));

        type_str(&mut app, SOLVED);
        app.handle_key(ctrl('v'));
        assert_eq!(app.final_word, "SNOWDRIFT");
        assert_eq!(
            app.store
                .get_completed_puzzle_state("2025-06-04")
                .map(|r| r.meta.hints_used),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_repeated_reveal_saves_once() {
        let mut app = app(Arc::new(MemoryStore::new()));
        type_str(&mut app, SOLVED);
        app.handle_key(ctrl('v'));
        let writes = app.pending.len();

        app.handle_key(ctrl('v'));
        app.handle_key(ctrl('v'));
        assert_eq!(app.final_word, "SNOWDRIFT");
        assert_eq!(app.pending.len(), writes);
        assert_eq!(
            app.store
                .get_completed_puzzle_state("2025-06-04")
                .map(|r| r.meta.hints_used),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_final_word_field() {
        let mut app = app(Arc::new(MemoryStore::new()));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::FinalWord);

        type_str(&mut app, "snowdraft");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.feedback, Some(Feedback::Word(WordCheck::Incorrect)));

        for _ in 0..5 {
            app.handle_key(key(KeyCode::Backspace));
        }
        type_str(&mut app, "drift");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.feedback, Some(Feedback::Word(WordCheck::Correct)));
        assert!(app.is_completed("2025-06-04"));
    }

    #[tokio::test]
    async fn test_day_navigation_restores_work() {
        let mut app = app(Arc::new(MemoryStore::new()));
        type_str(&mut app, "SO");

        app.handle_key(ctrl('p'));
        assert_eq!(app.date(), Some("2025-06-03"));
        assert!(app.session.as_ref().unwrap().grid().is_empty());

        app.handle_key(ctrl('n'));
        assert_eq!(app.date(), Some("2025-06-04"));
        assert_eq!(
            app.session.as_ref().unwrap().grid().to_string_compact(),
            "SO......."
        );

        app.handle_key(ctrl('n'));
        assert_eq!(app.date(), Some("2025-06-04"));
        assert_eq!(app.message.as_deref(), Some("No newer puzzle"));
    }

    #[tokio::test]
    async fn test_reset_and_quit() {
        let mut app = app(Arc::new(MemoryStore::new()));
        type_str(&mut app, "SNOW");
        app.handle_key(ctrl('r'));
        assert!(app.session.as_ref().unwrap().grid().is_empty());
        assert_eq!(app.cursor, 0);

        assert_eq!(app.handle_key(key(KeyCode::Esc)), AppAction::Quit);
        assert_eq!(app.handle_key(ctrl('c')), AppAction::Quit);
    }
}

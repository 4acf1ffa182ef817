//! Per-date progress: transient session records plus durable completions
//!
//! The store keeps three things in memory:
//! - session records for every date touched during this run
//! - the set of dates ever completed
//! - the full completion record for each completed date
//!
//! The last two are mirrored to the persistence backend under two fixed
//! keys. They are written together but not atomically, so after a crash
//! either one may be ahead of the other. Reads tolerate that: the date set
//! alone is enough to answer "is this date completed".

use crate::grid::GridState;
use crate::persistence::{PersistenceAdapter, PersistenceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Key of the completed-date set
pub const COMPLETIONS_KEY: &str = "completed_puzzles";
/// Key of the completion record list
pub const STATES_KEY: &str = "completed_puzzle_states";
/// Incomplete sessions older than this are dropped by a sweep
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Current Unix time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Caller-supplied details recorded with a completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionMeta {
    /// Final grid; falls back to the session snapshot when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridState>,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<u64>,
    /// Anything else the caller wants kept
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Transient state of one date during this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: String,
    pub grid: GridState,
    pub completed: bool,
    pub completion_time: Option<i64>,
    pub start_time: Option<i64>,
    /// Last write, used by the stale sweep
    pub updated_at: i64,
    pub meta: Option<CompletionMeta>,
}

/// Durable proof of a solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub date: String,
    #[serde(default = "always_true")]
    pub completed: bool,
    pub completion_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(flatten)]
    pub meta: CompletionMeta,
}

fn always_true() -> bool {
    true
}

impl CompletionRecord {
    pub fn grid(&self) -> Option<&GridState> {
        self.meta.grid.as_ref()
    }

    fn to_session(&self) -> SessionRecord {
        SessionRecord {
            date: self.date.clone(),
            grid: self.meta.grid.clone().unwrap_or_default(),
            completed: true,
            completion_time: Some(self.completion_time),
            start_time: self.start_time,
            updated_at: self.completion_time,
            meta: Some(self.meta.clone()),
        }
    }
}

/// What the store knows about a date
#[derive(Debug, Clone, PartialEq)]
pub enum PuzzleState {
    /// Worked on (or solved) during this run
    Session(SessionRecord),
    /// Solved in an earlier run, full record available
    PreviouslyCompleted(CompletionRecord),
    /// Solved in an earlier run, but only the date set knows it
    CompletedStub { date: String },
}

impl PuzzleState {
    pub fn is_completed(&self) -> bool {
        match self {
            PuzzleState::Session(record) => record.completed,
            PuzzleState::PreviouslyCompleted(_) | PuzzleState::CompletedStub { .. } => true,
        }
    }

    pub fn previously_completed(&self) -> bool {
        !matches!(self, PuzzleState::Session(_))
    }

    pub fn grid(&self) -> Option<&GridState> {
        match self {
            PuzzleState::Session(record) => Some(&record.grid),
            PuzzleState::PreviouslyCompleted(record) => record.grid(),
            PuzzleState::CompletedStub { .. } => None,
        }
    }

    pub fn start_time(&self) -> Option<i64> {
        match self {
            PuzzleState::Session(record) => record.start_time,
            PuzzleState::PreviouslyCompleted(record) => record.start_time,
            PuzzleState::CompletedStub { .. } => None,
        }
    }

    pub fn completion_time(&self) -> Option<i64> {
        match self {
            PuzzleState::Session(record) => record.completion_time,
            PuzzleState::PreviouslyCompleted(record) => Some(record.completion_time),
            PuzzleState::CompletedStub { .. } => None,
        }
    }

    pub fn meta(&self) -> Option<&CompletionMeta> {
        match self {
            PuzzleState::Session(record) => record.meta.as_ref(),
            PuzzleState::PreviouslyCompleted(record) => Some(&record.meta),
            PuzzleState::CompletedStub { .. } => None,
        }
    }
}

/// Outcome of a durable write. Failures have already been logged; callers
/// may use this to show a "not saved" indicator.
#[must_use]
#[derive(Debug)]
pub enum PersistOutcome {
    Ok,
    PersistFailed(Vec<PersistenceError>),
}

impl PersistOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, PersistOutcome::Ok)
    }

    pub fn errors(&self) -> &[PersistenceError] {
        match self {
            PersistOutcome::Ok => &[],
            PersistOutcome::PersistFailed(errors) => errors,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CompletionSetDoc {
    id: String,
    dates: Vec<String>,
    #[serde(default)]
    last_updated: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompletionStatesDoc {
    id: String,
    states: Vec<CompletionRecord>,
    #[serde(default)]
    last_updated: i64,
}

#[derive(Debug, Default)]
struct ProgressInner {
    sessions: HashMap<String, SessionRecord>,
    completed_dates: BTreeSet<String>,
    completed_states: BTreeMap<String, CompletionRecord>,
    /// Durable keys not read successfully yet. Writing one would replace
    /// records this run has never seen.
    unread: BTreeSet<&'static str>,
}

/// Session cache in front of durable completion records
pub struct ProgressStore {
    adapter: Arc<dyn PersistenceAdapter>,
    inner: Mutex<ProgressInner>,
    /// Serializes durable writes so an older snapshot never lands last
    write_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner();
        f.debug_struct("ProgressStore")
            .field("backend", &self.adapter.backend_name())
            .field("sessions", &inner.sessions.len())
            .field("completed", &inner.completed_dates.len())
            .finish()
    }
}

impl ProgressStore {
    /// Empty store on top of an adapter. Nothing is read yet; the first
    /// durable write reads and merges both projections before replacing them.
    pub fn new(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        let inner = ProgressInner {
            unread: BTreeSet::from([COMPLETIONS_KEY, STATES_KEY]),
            ..ProgressInner::default()
        };
        Self {
            adapter,
            inner: Mutex::new(inner),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a store and read both durable projections.
    ///
    /// A projection whose read fails starts out empty. If the failure may
    /// clear up (I/O, outage) the key is read again before it is next
    /// written and the stored records are merged in. Unparseable content is
    /// discarded and gets replaced by the next write.
    pub async fn load(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        let store = Self::new(adapter);
        store.read_unread().await;
        store
    }

    /// Read every projection not yet read and merge it under this run's
    /// in-memory records
    async fn read_unread(&self) {
        if self.is_unread(COMPLETIONS_KEY) {
            match self.read_doc::<CompletionSetDoc>(COMPLETIONS_KEY).await {
                Ok(doc) => {
                    let dates = doc.map(|doc| doc.dates).unwrap_or_default();
                    log::info!("Loaded {} completed dates", dates.len());
                    let mut inner = self.inner();
                    inner.completed_dates.extend(dates);
                    inner.unread.remove(COMPLETIONS_KEY);
                }
                Err(e) => self.read_failed(COMPLETIONS_KEY, e),
            }
        }

        if self.is_unread(STATES_KEY) {
            match self.read_doc::<CompletionStatesDoc>(STATES_KEY).await {
                Ok(doc) => {
                    let states = doc.map(|doc| doc.states).unwrap_or_default();
                    log::info!("Loaded {} completion records", states.len());
                    let mut inner = self.inner();
                    for record in states {
                        // A record made during this run is newer
                        inner.completed_states.entry(record.date.clone()).or_insert(record);
                    }
                    inner.unread.remove(STATES_KEY);
                }
                Err(e) => self.read_failed(STATES_KEY, e),
            }
        }
    }

    fn is_unread(&self, key: &str) -> bool {
        self.inner().unread.contains(key)
    }

    fn read_failed(&self, key: &'static str, e: PersistenceError) {
        if e.is_transient() {
            log::warn!("Could not load {}, will retry before saving it: {}", key, e);
        } else {
            log::warn!("Discarding unreadable {}: {}", key, e);
            self.inner().unread.remove(key);
        }
    }

    fn inner(&self) -> MutexGuard<'_, ProgressInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn read_doc<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError> {
        let Some(value) = self.adapter.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| PersistenceError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Replace the session record for `date` with a fresh snapshot.
    ///
    /// Last writer wins, except that a completed date stays completed:
    /// later edits never un-solve it, whether the solve happened in this
    /// run or an earlier one.
    pub fn save_session_state(&self, date: &str, grid: GridState, start_time: Option<i64>) {
        self.save_session_state_at(date, grid, start_time, now_millis());
    }

    fn save_session_state_at(
        &self,
        date: &str,
        grid: GridState,
        start_time: Option<i64>,
        now: i64,
    ) {
        let mut inner = self.inner();
        let (completed, completion_time, meta) =
            match inner.sessions.get(date).filter(|r| r.completed) {
                Some(r) => (true, r.completion_time, r.meta.clone()),
                None => match inner.completed_states.get(date) {
                    Some(r) => (true, Some(r.completion_time), Some(r.meta.clone())),
                    None => (inner.completed_dates.contains(date), None, None),
                },
            };
        let record = SessionRecord {
            date: date.to_string(),
            grid,
            completed,
            completion_time,
            start_time,
            updated_at: now,
            meta,
        };
        inner.sessions.insert(date.to_string(), record);
    }

    /// Record a solve in memory only. The session cache and both in-memory
    /// projections see it immediately.
    pub fn record_completion(&self, date: &str, meta: CompletionMeta) -> CompletionRecord {
        self.record_completion_at(date, meta, now_millis())
    }

    fn record_completion_at(&self, date: &str, mut meta: CompletionMeta, now: i64) -> CompletionRecord {
        let mut inner = self.inner();
        let session = inner.sessions.get(date);

        if meta.grid.is_none() {
            meta.grid = session.map(|r| r.grid.clone());
        }
        let record = CompletionRecord {
            date: date.to_string(),
            completed: true,
            completion_time: now,
            start_time: session.and_then(|r| r.start_time),
            meta,
        };

        inner.sessions.insert(date.to_string(), record.to_session());
        inner
            .completed_states
            .insert(date.to_string(), record.clone());
        inner.completed_dates.insert(date.to_string());

        log::debug!("Recorded completion for {}", date);
        record
    }

    /// Replace the metadata of an existing completion, keeping its time.
    /// Returns false if `date` has no full completion record.
    pub fn update_completion_meta(&self, date: &str, mut meta: CompletionMeta) -> bool {
        let mut inner = self.inner();
        let Some(record) = inner.completed_states.get_mut(date) else {
            return false;
        };
        if meta.grid.is_none() {
            meta.grid = record.meta.grid.take();
        }
        record.meta = meta;
        let session = record.to_session();
        if let Some(existing) = inner.sessions.get_mut(date) {
            existing.meta = session.meta;
        } else {
            inner.sessions.insert(date.to_string(), session);
        }
        true
    }

    /// Write both durable projections. Both writes are attempted even if
    /// one fails; each failure is logged. A projection that has never been
    /// read is read and merged first, and skipped if that read fails.
    pub async fn persist_completions(&self) -> PersistOutcome {
        let _guard = self.write_lock.lock().await;
        self.read_unread().await;

        let now = now_millis();
        let (completed, set_doc, states_doc) = {
            let inner = self.inner();
            let set_doc = (!inner.unread.contains(COMPLETIONS_KEY)).then(|| CompletionSetDoc {
                id: COMPLETIONS_KEY.to_string(),
                dates: inner.completed_dates.iter().cloned().collect(),
                last_updated: now,
            });
            let states_doc = (!inner.unread.contains(STATES_KEY)).then(|| CompletionStatesDoc {
                id: STATES_KEY.to_string(),
                states: inner.completed_states.values().cloned().collect(),
                last_updated: now,
            });
            (inner.completed_dates.len(), set_doc, states_doc)
        };

        let (set_result, states_result) = tokio::join!(
            self.write_loaded(COMPLETIONS_KEY, set_doc.as_ref()),
            self.write_loaded(STATES_KEY, states_doc.as_ref())
        );

        let mut errors = Vec::new();
        if let Err(e) = set_result {
            log::warn!("Could not save completions: {}", e);
            errors.push(e);
        }
        if let Err(e) = states_result {
            log::warn!("Could not save puzzle states: {}", e);
            errors.push(e);
        }

        if errors.is_empty() {
            log::info!(
                "Saved {} completions to {}",
                completed,
                self.adapter.backend_name()
            );
            PersistOutcome::Ok
        } else {
            PersistOutcome::PersistFailed(errors)
        }
    }

    /// Write a projection, or refuse when the stored copy was never read
    async fn write_loaded<T: Serialize>(
        &self,
        key: &str,
        doc: Option<&T>,
    ) -> Result<(), PersistenceError> {
        match doc {
            Some(doc) => self.write_doc(key, doc).await,
            None => Err(PersistenceError::Unavailable(format!(
                "{} could not be read, leaving it untouched",
                key
            ))),
        }
    }

    async fn write_doc<T: Serialize>(&self, key: &str, doc: &T) -> Result<(), PersistenceError> {
        let value = serde_json::to_value(doc).map_err(|source| PersistenceError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.adapter.put(key, value).await
    }

    /// Mark `date` solved and wait for both durable writes.
    ///
    /// The in-memory record is in place before the first write starts and
    /// stays authoritative for this run even if the writes fail.
    pub async fn mark_completed(&self, date: &str, meta: CompletionMeta) -> PersistOutcome {
        self.record_completion(date, meta);
        self.persist_completions().await
    }

    /// Resolve what is known about `date`: this run's session first, then
    /// the durable full record, then the bare completed-date set.
    pub fn get_puzzle_state(&self, date: &str) -> Option<PuzzleState> {
        let inner = self.inner();
        if let Some(record) = inner.sessions.get(date) {
            return Some(PuzzleState::Session(record.clone()));
        }
        if let Some(record) = inner.completed_states.get(date) {
            return Some(PuzzleState::PreviouslyCompleted(record.clone()));
        }
        if inner.completed_dates.contains(date) {
            return Some(PuzzleState::CompletedStub {
                date: date.to_string(),
            });
        }
        None
    }

    /// Full completion record for replaying a finished grid
    pub fn get_completed_puzzle_state(&self, date: &str) -> Option<CompletionRecord> {
        self.inner().completed_states.get(date).cloned()
    }

    /// Completed this run or in any earlier one
    pub fn is_completed(&self, date: &str) -> bool {
        let inner = self.inner();
        inner.sessions.get(date).is_some_and(|r| r.completed)
            || inner.completed_dates.contains(date)
    }

    /// Drop every session record. Durable records are untouched.
    pub fn clear_session(&self) {
        self.inner().sessions.clear();
    }

    /// Drop incomplete session records older than `max_age`
    pub fn sweep_stale_sessions(&self, max_age: Duration) -> usize {
        self.sweep_stale_sessions_at(now_millis(), max_age)
    }

    pub fn sweep_stale_sessions_at(&self, now: i64, max_age: Duration) -> usize {
        let cutoff = now.saturating_sub(i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX));
        let mut inner = self.inner();
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|_, record| record.completed || record.updated_at >= cutoff);
        let removed = before - inner.sessions.len();
        if removed > 0 {
            log::debug!("Swept {} stale sessions", removed);
        }
        removed
    }

    /// Every date known to be completed, oldest first
    pub fn completed_dates(&self) -> Vec<String> {
        self.inner().completed_dates.iter().cloned().collect()
    }

    /// Whether `date` has unfinished work this run
    pub fn has_session_work(&self, date: &str) -> bool {
        self.inner()
            .sessions
            .get(date)
            .is_some_and(|r| !r.completed)
    }

    pub fn backend_name(&self) -> &'static str {
        self.adapter.backend_name()
    }
}

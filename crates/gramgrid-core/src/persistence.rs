//! Key-value persistence backends
//!
//! Supports different backends based on environment:
//! - Local: one JSON file per key under the data directory
//! - Test: in-memory store with a switch to simulate outages
//!
//! Records are opaque JSON values looked up by exact key. There are no
//! transactions and no range queries.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur while reading or writing a record
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode or decode {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {key} has an unexpected shape: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    /// True when the record may still be readable later. Bad content stays
    /// bad, an outage or I/O error may clear up.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Unavailable(_))
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Async key-value store used by the progress store
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Fetch a record, `None` if the key has never been written
    async fn get(&self, key: &str) -> PersistenceResult<Option<Value>>;

    /// Store a record, replacing any previous value
    async fn put(&self, key: &str, record: Value) -> PersistenceResult<()>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Environment configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// File-backed storage in the data directory
    Local,
    /// In-memory storage
    Test,
}

impl Environment {
    /// Detect environment from GRAMGRID_ENV variable
    pub fn detect() -> Self {
        match std::env::var("GRAMGRID_ENV").as_deref() {
            Ok("test") | Ok("testing") => Environment::Test,
            _ => Environment::Local,
        }
    }
}

/// Directory holding durable progress: `GRAMGRID_DATA_DIR`, else the
/// platform data dir, else the working directory.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("GRAMGRID_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gramgrid")
}

/// Create the appropriate backend for an environment
pub fn create_adapter(env: Environment, dir: Option<PathBuf>) -> Arc<dyn PersistenceAdapter> {
    match env {
        Environment::Local => Arc::new(FileStore::new(dir.unwrap_or_else(data_dir))),
        Environment::Test => Arc::new(MemoryStore::new()),
    }
}

// ==================== Local File Backend ====================

/// Stores each key as `<dir>/<key>.json`
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl PersistenceAdapter for FileStore {
    async fn get(&self, key: &str) -> PersistenceResult<Option<Value>> {
        let path = self.path_for(key);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| PersistenceError::Serialization {
                key: key.to_string(),
                source,
            })
    }

    async fn put(&self, key: &str, record: Value) -> PersistenceResult<()> {
        let io_err = |source| PersistenceError::Io {
            key: key.to_string(),
            source,
        };

        let json =
            serde_json::to_string_pretty(&record).map_err(|source| PersistenceError::Serialization {
                key: key.to_string(),
                source,
            })?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;

        // Write then rename so a crash never leaves a half-written record
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "File"
    }
}

// ==================== Mock Backend for Testing ====================

/// In-memory store for testing
pub struct MemoryStore {
    data: Mutex<HashMap<String, Value>>,
    available: Mutex<bool>,
    /// Keys whose writes fail even while available
    failing_keys: Mutex<Vec<String>>,
    /// Keys whose reads fail even while available
    unreadable_keys: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            available: Mutex::new(true),
            failing_keys: Mutex::new(Vec::new()),
            unreadable_keys: Mutex::new(Vec::new()),
        }
    }

    /// Set whether reads and writes should succeed
    pub fn set_available(&self, available: bool) {
        *self.available.lock().unwrap_or_else(|p| p.into_inner()) = available;
    }

    /// Make writes to one key fail, simulating a crash between two writes
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.lock().unwrap_or_else(|p| p.into_inner()).push(key.to_string());
    }

    /// Make reads of one key fail until `heal_reads` is called
    pub fn fail_reads_from(&self, key: &str) {
        self.unreadable_keys.lock().unwrap_or_else(|p| p.into_inner()).push(key.to_string());
    }

    pub fn heal_reads(&self) {
        self.unreadable_keys.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Raw record, bypassing availability
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.data.lock().unwrap_or_else(|p| p.into_inner()).get(key).cloned()
    }

    /// Get record count
    pub fn count(&self) -> usize {
        self.data.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn check_available(&self) -> PersistenceResult<()> {
        if *self.available.lock().unwrap_or_else(|p| p.into_inner()) {
            Ok(())
        } else {
            Err(PersistenceError::Unavailable("Mock unavailable".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStore {
    async fn get(&self, key: &str) -> PersistenceResult<Option<Value>> {
        self.check_available()?;
        if self.unreadable_keys.lock().unwrap_or_else(|p| p.into_inner()).iter().any(|k| k == key) {
            return Err(PersistenceError::Unavailable(format!("read of {} failed", key)));
        }
        Ok(self.data.lock().unwrap_or_else(|p| p.into_inner()).get(key).cloned())
    }

    async fn put(&self, key: &str, record: Value) -> PersistenceResult<()> {
        self.check_available()?;
        if self.failing_keys.lock().unwrap_or_else(|p| p.into_inner()).iter().any(|k| k == key) {
            return Err(PersistenceError::Unavailable(format!("write to {} failed", key)));
        }
        self.data.lock().unwrap_or_else(|p| p.into_inner()).insert(key.to_string(), record);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Memory"
    }
}

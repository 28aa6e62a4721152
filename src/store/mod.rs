//! Durable state: a sled database with one tree per concern.
//!
//! ```text
//! <db-path>/
//! ├── history   — chat id → bounded list of message ids
//! └── language  — chat id → reply language code
//! ```
//!
//! Both trees share one database handle, safe for concurrent use by every
//! watcher. Failing to open the database is fatal to the process: no
//! storage, no service.

pub mod history;
pub mod kv;
pub mod language;

pub use history::ChatHistoryStore;
pub use kv::{KvStore, Value};
pub use language::{ChatLanguageStore, Language};

use std::path::Path;
use std::sync::Arc;

use crate::error::StorageError;

/// The opened stores, shared process-wide.
pub struct Stores {
    pub history: Arc<ChatHistoryStore>,
    pub languages: Arc<ChatLanguageStore>,
    db: sled::Db,
}

impl Stores {
    /// Open (or create) the database and its namespaces.
    pub fn open(path: &Path, capacity: usize) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let history = KvStore::open(&db, "history")?;
        let languages = KvStore::open(&db, "language")?;
        Ok(Self {
            history: Arc::new(ChatHistoryStore::new(history, capacity)),
            languages: Arc::new(ChatLanguageStore::new(languages)),
            db,
        })
    }

    /// Flush outstanding writes. Called once at teardown, after every
    /// watcher has stopped.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────

//! Per-chat reply language, layered on the key-value store.
//!
//! The language entry doubles as the marker for "this chat is started":
//! `/start` writes the default language and `/stop` deletes the entry.

use std::fmt;

use tracing::warn;

use crate::error::StorageError;
use crate::store::kv::{KvStore, Value};

/// Reply languages with a shipped phrase dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    /// All supported languages, used to load one dictionary per language.
    pub const ALL: [Language; 2] = [Language::En, Language::Ru];

    /// Two-letter code used in storage, file names and commands.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }

    /// Parse a stored or user-supplied code.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "ru" => Some(Language::Ru),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Per-chat language setting.
pub struct ChatLanguageStore {
    kv: KvStore,
}

impl ChatLanguageStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Set the reply language for a chat, durably.
    pub fn set_language(&self, chat_id: i64, language: Language) -> Result<(), StorageError> {
        self.kv
            .put(&chat_id.to_string(), &Value::Text(language.code().to_string()))
    }

    /// The chat's reply language. Absence, a read failure, or an
    /// unrecognized stored code all degrade to the default (`en`) — a
    /// recall must not be blocked by a transient storage problem — with
    /// the failure logged for the operator.
    pub fn language_or_default(&self, chat_id: i64) -> Language {
        let key = chat_id.to_string();
        match self.kv.get(&key) {
            Ok(None) => Language::default(),
            Ok(Some(Value::Text(code))) => Language::parse(&code).unwrap_or_else(|| {
                warn!(chat_id, %code, "unrecognized stored language, using default");
                Language::default()
            }),
            Ok(Some(_)) => {
                warn!(chat_id, "language entry has wrong shape, using default");
                Language::default()
            }
            Err(error) => {
                warn!(chat_id, %error, "failed to read chat language, using default");
                Language::default()
            }
        }
    }

    /// Whether the chat has been started (has a language entry).
    pub fn exists(&self, chat_id: i64) -> Result<bool, StorageError> {
        self.kv.exists(&chat_id.to_string())
    }

    /// Forget the chat's language. Used when a chat is stopped.
    pub fn remove(&self, chat_id: i64) -> Result<(), StorageError> {
        self.kv.delete(&chat_id.to_string())
    }

    /// Chat ids with a language entry, for watcher reconstruction at
    /// startup.
    pub fn chats(&self) -> Result<Vec<i64>, StorageError> {
        let mut ids = Vec::new();
        for entry in self.kv.iter() {
            let (key, _) = entry?;
            match key.parse::<i64>() {
                Ok(id) => ids.push(id),
                Err(_) => warn!(%key, "skipping language entry with non-numeric key"),
            }
        }
        Ok(ids)
    }
}

// ── Tests ───────────────────────────────────────────────────────

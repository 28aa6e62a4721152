//! Bounded per-chat message history, layered on the key-value store.
//!
//! Each chat's history is one `Value::MessageIds` entry keyed by the
//! decimal chat id, oldest message first. Appends round-trip through the
//! store — there is no in-memory cache — so the store stays the single
//! source of truth. Concurrent appends to the same chat are serialized by
//! the one-watcher-per-chat rule; this type does not add its own locking.

use tracing::warn;

use crate::error::StorageError;
use crate::store::kv::{KvStore, Value};

/// Per-chat bounded message history.
pub struct ChatHistoryStore {
    kv: KvStore,
    capacity: usize,
}

impl ChatHistoryStore {
    /// Wrap a namespace with a per-chat capacity. A capacity below one is
    /// clamped to one so an append can always retain the new message.
    pub fn new(kv: KvStore, capacity: usize) -> Self {
        Self {
            kv,
            capacity: capacity.max(1),
        }
    }

    /// Record a message id for a chat. If the history is at capacity, the
    /// oldest entries are dropped first so the result holds the most
    /// recent `capacity` ids.
    pub fn append(&self, chat_id: i64, message_id: i64) -> Result<(), StorageError> {
        let key = chat_id.to_string();
        let mut ids = match self.kv.get(&key)? {
            None => Vec::new(),
            Some(Value::MessageIds(ids)) => ids,
            Some(_) => {
                return Err(StorageError::Shape {
                    key,
                    expected: "message id list",
                })
            }
        };

        if ids.len() >= self.capacity {
            let drop = ids.len() + 1 - self.capacity;
            ids.drain(..drop);
        }
        ids.push(message_id);

        self.kv.put(&key, &Value::MessageIds(ids))
    }

    /// All recorded message ids for a chat, oldest first. `None` means the
    /// chat has no history yet.
    pub fn read_all(&self, chat_id: i64) -> Result<Option<Vec<i64>>, StorageError> {
        let key = chat_id.to_string();
        match self.kv.get(&key)? {
            None => Ok(None),
            Some(Value::MessageIds(ids)) => Ok(Some(ids)),
            Some(_) => Err(StorageError::Shape {
                key,
                expected: "message id list",
            }),
        }
    }

    /// Drop a chat's entire history. Used when a chat is stopped.
    pub fn remove(&self, chat_id: i64) -> Result<(), StorageError> {
        self.kv.delete(&chat_id.to_string())
    }

    /// Chat ids that currently have history. Keys that do not parse as a
    /// chat id are logged and skipped.
    pub fn chats(&self) -> Result<Vec<i64>, StorageError> {
        let mut ids = Vec::new();
        for entry in self.kv.iter() {
            let (key, _) = entry?;
            match key.parse::<i64>() {
                Ok(id) => ids.push(id),
                Err(_) => warn!(%key, "skipping history entry with non-numeric key"),
            }
        }
        Ok(ids)
    }
}

// ── Tests ───────────────────────────────────────────────────────

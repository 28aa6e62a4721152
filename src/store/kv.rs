//! Durable key-value store backed by sled.
//!
//! Every value is a [`Value`] — a small tagged union covering the shapes
//! the bot persists — encoded with bincode. The tag travels with the bytes,
//! so a read that finds a different shape than the caller expected becomes
//! a typed [`StorageError::Shape`] instead of a runtime surprise.
//!
//! Writes flush before returning so state survives a process restart.
//! sled serializes concurrent access to a key internally; nothing here
//! needs extra locking.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// The shapes the bot stores. Decoded by exhaustive match at the callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// An ordered list of Telegram message ids, oldest first.
    MessageIds(Vec<i64>),
    /// A small string setting, e.g. a language code.
    Text(String),
}

/// One namespace (sled tree) of the embedded database.
pub struct KvStore {
    tree: sled::Tree,
}

impl KvStore {
    /// Open the named namespace inside an already-open database.
    pub fn open(db: &sled::Db, name: &str) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree(name)?,
        })
    }

    /// Store a value under a key, durably.
    pub fn put(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let bytes = bincode::serialize(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.tree.insert(key.as_bytes(), bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    /// Fetch a value. `Ok(None)` means the key has never been written —
    /// callers usually treat that as "no data yet", not as an error.
    pub fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        match self.tree.get(key.as_bytes())? {
            None => Ok(None),
            Some(bytes) => bincode::deserialize(&bytes).map(Some).map_err(|source| {
                StorageError::Decode {
                    key: key.to_string(),
                    source,
                }
            }),
        }
    }

    /// Whether a key has ever been written.
    pub fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.tree.contains_key(key.as_bytes())?)
    }

    /// Remove a key, durably. Removing an absent key is a no-op.
    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.tree.remove(key.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }

    /// Iterate over every entry in this namespace, decoded. Each call
    /// starts a fresh pass from the first key.
    pub fn iter(&self) -> impl Iterator<Item = Result<(String, Value), StorageError>> + '_ {
        self.tree.iter().map(|entry| {
            let (key, bytes) = entry?;
            let key = String::from_utf8_lossy(&key).into_owned();
            let value = bincode::deserialize(&bytes).map_err(|source| StorageError::Decode {
                key: key.clone(),
                source,
            })?;
            Ok((key, value))
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, KvStore) {
        let tmp = TempDir::new().unwrap();
        let db = sled::open(tmp.path()).unwrap();
        let store = KvStore::open(&db, "test").unwrap();
        (tmp, store)
    }

    #[test]
    fn message_ids_round_trip() {
        let (_tmp, store) = open_store();
        let value = Value::MessageIds(vec![1, 5, 42]);
        store.put("100", &value).unwrap();
        assert_eq!(store.get("100").unwrap(), Some(value));
    }

    #[test]
    fn text_round_trips() {
        let (_tmp, store) = open_store();
        let value = Value::Text("ru".to_string());
        store.put("100", &value).unwrap();
        assert_eq!(store.get("100").unwrap(), Some(value));
    }

    #[test]
    fn absent_key_reads_as_none() {
        let (_tmp, store) = open_store();
        assert_eq!(store.get("nothing").unwrap(), None);
    }

    #[test]
    fn exists_reflects_put_and_delete() {
        let (_tmp, store) = open_store();
        assert!(!store.exists("k").unwrap());
        store.put("k", &Value::Text("x".into())).unwrap();
        assert!(store.exists("k").unwrap());
        store.delete("k").unwrap();
        assert!(!store.exists("k").unwrap());
    }

    #[test]
    fn delete_of_absent_key_is_a_noop() {
        let (_tmp, store) = open_store();
        store.delete("never-written").unwrap();
    }

    #[test]
    fn overwrite_replaces_the_value() {
        let (_tmp, store) = open_store();
        store.put("k", &Value::MessageIds(vec![1])).unwrap();
        store.put("k", &Value::MessageIds(vec![2, 3])).unwrap();
        assert_eq!(
            store.get("k").unwrap(),
            Some(Value::MessageIds(vec![2, 3]))
        );
    }

    #[test]
    fn iter_yields_every_entry() {
        let (_tmp, store) = open_store();
        store.put("a", &Value::Text("1".into())).unwrap();
        store.put("b", &Value::MessageIds(vec![2])).unwrap();

        let entries: Vec<_> = store.iter().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|(k, _)| k == "a"));
        assert!(entries.iter().any(|(k, _)| k == "b"));
    }

    #[test]
    fn iter_restarts_on_each_call() {
        let (_tmp, store) = open_store();
        store.put("a", &Value::Text("1".into())).unwrap();
        assert_eq!(store.iter().count(), 1);
        assert_eq!(store.iter().count(), 1);
    }

    #[test]
    fn garbage_bytes_decode_to_typed_error() {
        let (_tmp, store) = open_store();
        store.tree.insert(b"bad", &[0xff, 0xff, 0xff, 0xff][..]).unwrap();
        match store.get("bad") {
            Err(StorageError::Decode { key, .. }) => assert_eq!(key, "bad"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn state_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let db = sled::open(tmp.path()).unwrap();
            let store = KvStore::open(&db, "test").unwrap();
            store.put("k", &Value::MessageIds(vec![7])).unwrap();
        }
        let db = sled::open(tmp.path()).unwrap();
        let store = KvStore::open(&db, "test").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Value::MessageIds(vec![7])));
    }
}

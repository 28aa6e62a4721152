//! Error taxonomy for the bot's library layer.
//!
//! Three families of failure exist and they are handled differently:
//!
//! - [`StorageError`] — the embedded database could not read or write.
//!   Callers degrade: a failed read is treated as "no data yet", a failed
//!   write is logged and the watcher keeps running.
//! - [`SendError`] — a Telegram API call failed. The attempt is abandoned
//!   and logged; nothing is retried and no error is echoed into the chat.
//! - [`CatalogError`] — the reply catalog is missing phrases that a recall
//!   actually needs. This is a deployment defect and is surfaced loudly,
//!   but it must not take down watchers for other chats.

use thiserror::Error;

/// Failure inside the key-value store (I/O or encoding).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sled::Error),

    #[error("failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        source: bincode::Error,
    },

    #[error("failed to decode value for key {key}: {source}")]
    Decode {
        key: String,
        source: bincode::Error,
    },

    /// A key decoded cleanly but held a different shape than the caller
    /// stores under it. Distinguished from `Decode` so the log line points
    /// at a logic or migration problem rather than corrupt bytes.
    #[error("unexpected value shape for key {key}: expected {expected}")]
    Shape { key: String, expected: &'static str },
}

/// Failure of an outbound Telegram call.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered but with `ok=false`.
    #[error("telegram API rejected the call: {0}")]
    Api(String),
}

/// Missing or empty reply-catalog data needed at recall time.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no reply catalog loaded for language {0}")]
    UnknownLanguage(&'static str),

    #[error("reply catalog for {language} has no {kind} phrases")]
    EmptyPhrases {
        language: &'static str,
        kind: &'static str,
    },
}

/// Anything that can abort a single recall attempt.
#[derive(Debug, Error)]
pub enum RecallError {
    /// Guard against misuse: the decision engine requires history.
    #[error("recall requested for a chat with no recorded history")]
    EmptyHistory,

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

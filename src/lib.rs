//! A Telegram bot that remembers what a chat said and brings it back.
//!
//! Per conversation the bot keeps a bounded history of message ids in an
//! embedded database. When a chat has been quiet for a configured number
//! of minutes — inside a daily hour window — the chat's watcher may
//! (with 30 % probability per idle period) forward one remembered message
//! back into the chat along with a canned phrase in the chat's language.
//!
//! ## Architecture
//!
//! ```text
//! getUpdates loop (bot)
//!       │ per message
//!       ▼
//! command dispatch ── /start /stop /help /recall /en /ru
//!       │ every message
//!       ▼
//! ChatRegistry::route ──► per-chat Watcher task
//!                           │ admissible? ──► ChatHistoryStore
//!                           │ 1 s idle timer ──► recall decision
//!                           ▼
//!                         forwardMessage + sendMessage
//! ```
//!
//! Storage is a sled database with one tree for history and one for the
//! per-chat language; both survive restarts, and the registry rebuilds a
//! watcher for every persisted chat at startup.

pub mod bot;
pub mod config;
pub mod error;
pub mod recall;
pub mod registry;
pub mod replies;
pub mod store;
pub mod telegram;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

//! Registry of currently-watched chats.
//!
//! Owns the chat-id → watcher-handle map and the watcher lifecycle:
//! start on `/start` (or on restart, for every chat with persisted
//! state), stop on `/stop`. Routing an event to an unknown chat is a
//! silent drop; stopping an unknown or already-stopped chat is a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Options;
use crate::replies::ReplyCatalog;
use crate::store::{ChatHistoryStore, ChatLanguageStore};
use crate::telegram::Transport;
use crate::watcher::{InboundEvent, Watcher, WatcherHandle};

/// Tracks which chats have a live watcher and owns their handles.
pub struct ChatRegistry {
    opts: Arc<Options>,
    history: Arc<ChatHistoryStore>,
    languages: Arc<ChatLanguageStore>,
    catalog: Arc<ReplyCatalog>,
    transport: Arc<dyn Transport>,
    watchers: Mutex<HashMap<i64, WatcherHandle>>,
}

impl ChatRegistry {
    pub fn new(
        opts: Arc<Options>,
        history: Arc<ChatHistoryStore>,
        languages: Arc<ChatLanguageStore>,
        catalog: Arc<ReplyCatalog>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            opts,
            history,
            languages,
            catalog,
            transport,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Start a watcher for the chat if none exists. No-op otherwise.
    pub async fn ensure_watching(&self, chat_id: i64) {
        let mut watchers = self.watchers.lock().await;
        if watchers.contains_key(&chat_id) {
            return;
        }
        let watcher = Watcher {
            chat_id,
            opts: self.opts.clone(),
            history: self.history.clone(),
            languages: self.languages.clone(),
            catalog: self.catalog.clone(),
            transport: self.transport.clone(),
        };
        watchers.insert(chat_id, watcher.spawn());
        info!(chat_id, "watching chat");
    }

    /// Stop the chat's watcher and forget it. Idempotent: an unknown or
    /// already-stopped chat is a no-op.
    pub async fn stop_watching(&self, chat_id: i64) {
        if let Some(handle) = self.watchers.lock().await.remove(&chat_id) {
            // Detached; the task winds down on its own once the channel
            // closes, without cancelling an in-flight recall.
            let _ = handle.stop();
            info!(chat_id, "stopped watching chat");
        }
    }

    /// Deliver an event to its chat's watcher. Unknown chats are dropped
    /// silently; a busy watcher slot drops the event as well.
    pub async fn route(&self, event: InboundEvent) {
        if let Some(handle) = self.watchers.lock().await.get(&event.chat_id) {
            handle.deliver(event);
        }
    }

    /// Reconstruct one watcher per chat with persisted state (language
    /// or history), so recall scheduling resumes after a restart.
    /// Returns how many chats are being watched.
    pub async fn restore(&self) -> usize {
        let mut chats = Vec::new();
        match self.languages.chats() {
            Ok(ids) => chats.extend(ids),
            Err(err) => warn!(error = %err, "failed to list chats with a language entry"),
        }
        match self.history.chats() {
            Ok(ids) => chats.extend(ids),
            Err(err) => warn!(error = %err, "failed to list chats with history"),
        }
        chats.sort_unstable();
        chats.dedup();

        for chat_id in &chats {
            self.ensure_watching(*chat_id).await;
        }
        chats.len()
    }

    /// Whether the chat currently has a live watcher.
    pub async fn is_watching(&self, chat_id: i64) -> bool {
        self.watchers.lock().await.contains_key(&chat_id)
    }

    /// Stop every watcher and wait for the tasks to finish. Part of the
    /// ordered teardown: watchers first, then the store.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = self.watchers.lock().await.drain().collect();
        for (chat_id, handle) in handles {
            let task = handle.stop();
            if let Err(err) = task.await {
                warn!(chat_id, error = %err, "watcher task ended abnormally");
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replies::ReplyKind;
    use crate::store::{Language, Stores};
    use crate::testing::{catalog_with_one_phrase_each, MockTransport};
    use clap::Parser;
    use tempfile::TempDir;

    fn registry_with(stores: &Stores, transport: Arc<MockTransport>) -> ChatRegistry {
        ChatRegistry::new(
            Arc::new(Options::parse_from(["reminisce", "123:token"])),
            stores.history.clone(),
            stores.languages.clone(),
            Arc::new(catalog_with_one_phrase_each()),
            transport,
        )
    }

    fn event_for(chat_id: i64) -> InboundEvent {
        InboundEvent {
            chat_id,
            message_id: 10,
            timestamp: 1_707_900_000,
            is_channel: false,
            text: "five words are enough here".to_string(),
            has_attachment: false,
        }
    }

    #[tokio::test]
    async fn ensure_watching_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let stores = Stores::open(tmp.path(), 8).unwrap();
        let registry = registry_with(&stores, Arc::new(MockTransport::new(ReplyKind::Text)));

        registry.ensure_watching(1).await;
        registry.ensure_watching(1).await;
        assert!(registry.is_watching(1).await);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn stop_of_unknown_chat_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let stores = Stores::open(tmp.path(), 8).unwrap();
        let registry = registry_with(&stores, Arc::new(MockTransport::new(ReplyKind::Text)));

        registry.stop_watching(404).await;
        // And stopping twice is equally harmless.
        registry.ensure_watching(1).await;
        registry.stop_watching(1).await;
        registry.stop_watching(1).await;
        assert!(!registry.is_watching(1).await);
    }

    #[tokio::test]
    async fn route_to_unknown_chat_drops_silently() {
        let tmp = TempDir::new().unwrap();
        let stores = Stores::open(tmp.path(), 8).unwrap();
        let registry = registry_with(&stores, Arc::new(MockTransport::new(ReplyKind::Text)));

        registry.route(event_for(99)).await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(stores.history.read_all(99).unwrap(), None);
    }

    #[tokio::test]
    async fn routed_event_reaches_the_watcher() {
        let tmp = TempDir::new().unwrap();
        let stores = Stores::open(tmp.path(), 8).unwrap();
        let registry = registry_with(&stores, Arc::new(MockTransport::new(ReplyKind::Text)));

        registry.ensure_watching(7).await;
        registry.route(event_for(7)).await;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert_eq!(stores.history.read_all(7).unwrap(), Some(vec![10]));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn restore_rebuilds_watchers_from_persisted_chats() {
        let tmp = TempDir::new().unwrap();
        let stores = Stores::open(tmp.path(), 8).unwrap();
        stores.languages.set_language(1, Language::En).unwrap();
        stores.history.append(2, 100).unwrap();
        // Chat 3 has both kinds of state; it must not be watched twice.
        stores.languages.set_language(3, Language::Ru).unwrap();
        stores.history.append(3, 300).unwrap();

        let registry = registry_with(&stores, Arc::new(MockTransport::new(ReplyKind::Text)));
        let restored = registry.restore().await;

        assert_eq!(restored, 3);
        assert!(registry.is_watching(1).await);
        assert!(registry.is_watching(2).await);
        assert!(registry.is_watching(3).await);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_every_watcher() {
        let tmp = TempDir::new().unwrap();
        let stores = Stores::open(tmp.path(), 8).unwrap();
        let registry = registry_with(&stores, Arc::new(MockTransport::new(ReplyKind::Text)));

        registry.ensure_watching(1).await;
        registry.ensure_watching(2).await;
        registry.shutdown().await;
        assert!(!registry.is_watching(1).await);
        assert!(!registry.is_watching(2).await);
    }
}

//! Command dispatch and the bot's main loop.
//!
//! The loop polls Telegram for updates and translates each message into
//! calls on the core surface: `on_start`, `on_stop`, `on_language_change`
//! and `on_inbound_message`. All of these return promptly — the actual
//! recall work happens on the per-chat watcher tasks, and the manual
//! `/recall` command is spawned onto its own task.
//!
//! Initialization order: open store → reconstruct the registry from
//! persisted chats → start accepting updates. Teardown order: stop all
//! watchers → flush the store.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Options;
use crate::recall::recall_now;
use crate::registry::ChatRegistry;
use crate::replies::ReplyCatalog;
use crate::store::{Language, Stores};
use crate::telegram::{Message, TelegramApi};
use crate::watcher::InboundEvent;

/// Telegram-side long-poll timeout for `getUpdates` (seconds).
const LONG_POLL_TIMEOUT_SECS: u64 = 60;

/// Back-off after a failed `getUpdates` call.
const POLL_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(10);

const WELCOME: &str = "*I remember what you said*\n\n\
    This bot prowls through the chat history and recalls some messages \
    from time to time.\n\n\
    *Commands you can use:*\n\n\
    /start - start the bot\n\
    /stop - stop the bot\n\
    /recall - recall a random message\n\
    /ru | /en - change the language\n\
    /help - show this message";

/// The assembled bot: stores, registry, catalog and transport.
pub struct Bot {
    stores: Stores,
    catalog: Arc<ReplyCatalog>,
    api: Arc<TelegramApi>,
    registry: ChatRegistry,
}

impl Bot {
    pub fn new(opts: Arc<Options>, stores: Stores, catalog: ReplyCatalog, api: TelegramApi) -> Self {
        let catalog = Arc::new(catalog);
        let api = Arc::new(api);
        let registry = ChatRegistry::new(
            opts,
            stores.history.clone(),
            stores.languages.clone(),
            catalog.clone(),
            api.clone(),
        );
        Self {
            stores,
            catalog,
            api,
            registry,
        }
    }

    /// Resume persisted chats and poll for updates until the process is
    /// asked to stop.
    pub async fn run(&self) -> Result<()> {
        let resumed = self.registry.restore().await;
        info!(resumed, "resumed watching persisted chats");

        let mut offset: Option<i64> = None;
        loop {
            match self.api.get_updates(offset, LONG_POLL_TIMEOUT_SECS).await {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        if let Some(message) = update.message {
                            self.dispatch(&message).await;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "getUpdates failed, backing off");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    /// Ordered teardown: stop all watchers, then flush the store.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
        if let Err(err) = self.stores.flush() {
            warn!(error = %err, "failed to flush store during shutdown");
        }
    }

    // ── Dispatch ────────────────────────────────────────────────

    /// Handle one incoming message: recognized commands first, then the
    /// raw event is routed to the chat's watcher (commands included — a
    /// command is activity too).
    pub async fn dispatch(&self, message: &Message) {
        let chat_id = message.chat.id;
        info!(
            chat_id,
            from = message.from.as_ref().map(|u| u.first_name.as_str()),
            command = message.command(),
            "incoming message"
        );

        match message.command() {
            Some("start") => {
                self.send_welcome(chat_id).await;
                self.on_start(chat_id).await;
            }
            Some("stop") => self.on_stop(chat_id).await,
            Some("help") => self.send_welcome(chat_id).await,
            Some("recall") => {
                if !message.chat.is_channel() {
                    // Off the dispatch path; the reply arrives whenever
                    // the forward and send complete.
                    tokio::spawn(recall_now(
                        self.api.clone(),
                        self.catalog.clone(),
                        self.stores.history.clone(),
                        self.stores.languages.clone(),
                        chat_id,
                    ));
                }
            }
            // `/en`, `/ru`
            Some(code) => {
                if let Some(language) = Language::parse(code) {
                    self.on_language_change(chat_id, language).await;
                }
            }
            None => {}
        }

        self.on_inbound_message(event_from(message)).await;
    }

    // ── Core surface ────────────────────────────────────────────

    /// Start watching a chat. First contact also records the default
    /// language; a chat that is already started keeps its setting.
    pub async fn on_start(&self, chat_id: i64) {
        match self.stores.languages.exists(chat_id) {
            Ok(false) => {
                if let Err(err) = self.stores.languages.set_language(chat_id, Language::default())
                {
                    warn!(chat_id, error = %err, "failed to record default language");
                }
            }
            Ok(true) => {}
            Err(err) => warn!(chat_id, error = %err, "failed to check chat state"),
        }
        self.registry.ensure_watching(chat_id).await;
    }

    /// Stop watching a chat and delete its persisted state. Idempotent.
    pub async fn on_stop(&self, chat_id: i64) {
        self.registry.stop_watching(chat_id).await;
        if let Err(err) = self.stores.languages.remove(chat_id) {
            warn!(chat_id, error = %err, "failed to remove chat language");
        }
        if let Err(err) = self.stores.history.remove(chat_id) {
            warn!(chat_id, error = %err, "failed to remove chat history");
        }
    }

    /// Change the chat's reply language.
    pub async fn on_language_change(&self, chat_id: i64, language: Language) {
        match self.stores.languages.set_language(chat_id, language) {
            Ok(()) => info!(chat_id, %language, "language changed"),
            Err(err) => warn!(chat_id, %language, error = %err, "failed to set language"),
        }
    }

    /// Route a raw inbound event to the chat's watcher, if any.
    pub async fn on_inbound_message(&self, event: InboundEvent) {
        self.registry.route(event).await;
    }

    async fn send_welcome(&self, chat_id: i64) {
        if let Err(err) = self.api.send_markdown(chat_id, WELCOME).await {
            warn!(chat_id, error = %err, "failed to send welcome message");
        }
    }
}

fn event_from(message: &Message) -> InboundEvent {
    InboundEvent {
        chat_id: message.chat.id,
        message_id: message.message_id,
        timestamp: message.date,
        is_channel: message.chat.is_channel(),
        text: message.text.clone().unwrap_or_default(),
        has_attachment: message.photo.is_some(),
    }
}

// ── Tests ───────────────────────────────────────────────────────

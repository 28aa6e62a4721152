//! Per-chat watcher: idle detection and recall scheduling.
//!
//! One tokio task runs per watched chat. It owns the chat's idle clock
//! and a single-slot inbound channel. Inbound events reset the clock and,
//! when admissible, are appended to the chat's history. Independently, a
//! once-per-second timer re-evaluates the idle condition: inside the
//! configured daily hour window, a chat that has been quiet for at least
//! the configured timeout gets one 30 % draw. Whether or not the draw
//! hits, the idle clock resets, so each idle period produces exactly one
//! draw.
//!
//! Stopping works through channel closure: the registry drops the sender
//! half, the next `recv` returns `None`, and the task winds down. A stop
//! therefore never interrupts an in-flight recall but guarantees no
//! further one is emitted.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Timelike};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Options;
use crate::recall::recall_now;
use crate::replies::ReplyCatalog;
use crate::store::{ChatHistoryStore, ChatLanguageStore};
use crate::telegram::Transport;

/// Chance that an expired idle period actually produces a recall.
const RECALL_PROBABILITY: f64 = 0.3;

/// How often the idle condition is re-evaluated.
const IDLE_CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

// ── Inbound events ──────────────────────────────────────────────

/// A transport-agnostic view of one inbound message.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub chat_id: i64,
    pub message_id: i64,
    /// Unix timestamp (seconds) of the message.
    pub timestamp: i64,
    pub is_channel: bool,
    pub text: String,
    pub has_attachment: bool,
}

/// Whether an event qualifies for history recording: not a channel, and
/// either an attachment or a word count within the configured bounds.
pub(crate) fn admissible(event: &InboundEvent, min_words: usize, max_words: usize) -> bool {
    if event.is_channel {
        return false;
    }
    if event.has_attachment {
        return true;
    }
    let words = event.text.split_whitespace().count();
    words >= min_words && words <= max_words
}

// ── Idle evaluation ─────────────────────────────────────────────

/// Outcome of one idle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdleCheck {
    /// Current hour is outside the daily recall window.
    OutsideWindow,
    /// The chat has not been quiet for long enough.
    NotIdle,
    /// The idle period expired but the draw missed. The idle clock must
    /// still reset so this period is not drawn again.
    Skipped,
    /// The idle period expired and the draw hit.
    Recall,
}

/// Decide what an idle check at `now` should do. Pure; the random draw
/// is passed in.
pub(crate) fn evaluate_idle(
    now: DateTime<Local>,
    last_activity: DateTime<Local>,
    opts: &Options,
    draw: f64,
) -> IdleCheck {
    let hour = now.hour();
    if hour < opts.hour_start || hour >= opts.hour_end {
        return IdleCheck::OutsideWindow;
    }
    if now - last_activity < Duration::minutes(opts.timeout) {
        return IdleCheck::NotIdle;
    }
    if draw < RECALL_PROBABILITY {
        IdleCheck::Recall
    } else {
        IdleCheck::Skipped
    }
}

// ── Watcher ─────────────────────────────────────────────────────

/// The per-chat scheduling loop, before it is spawned.
pub struct Watcher {
    pub chat_id: i64,
    pub opts: Arc<Options>,
    pub history: Arc<ChatHistoryStore>,
    pub languages: Arc<ChatLanguageStore>,
    pub catalog: Arc<ReplyCatalog>,
    pub transport: Arc<dyn Transport>,
}

/// Handle held by the registry: routes events in, and stops the watcher
/// when dropped.
pub struct WatcherHandle {
    tx: mpsc::Sender<InboundEvent>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Non-blocking, at-most-once delivery into the watcher's slot. A
    /// watcher drains promptly; a full slot means it is mid-recall, and
    /// the event is dropped rather than awaited.
    pub fn deliver(&self, event: InboundEvent) {
        if let Err(err) = self.tx.try_send(event) {
            debug!(error = %err, "inbound slot busy, dropping event");
        }
    }

    /// Stop the watcher. Returns the task handle so teardown can await
    /// completion.
    pub fn stop(self) -> JoinHandle<()> {
        drop(self.tx);
        self.task
    }
}

impl Watcher {
    /// Start the watcher task in `Active` state. The idle clock starts
    /// at now.
    pub fn spawn(self) -> WatcherHandle {
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(rx));
        WatcherHandle { tx, task }
    }

    async fn run(self, mut rx: mpsc::Receiver<InboundEvent>) {
        let mut last_activity = Local::now();
        let mut ticker = tokio::time::interval(IDLE_CHECK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        debug!(chat_id = self.chat_id, "watcher started");

        loop {
            tokio::select! {
                // Poll the channel first. When a stop races a due tick,
                // the closed channel must win, or a recall could still go
                // out after the stop.
                biased;

                maybe_event = rx.recv() => match maybe_event {
                    Some(event) => {
                        self.observe(&event);
                        last_activity = Local
                            .timestamp_opt(event.timestamp, 0)
                            .single()
                            .unwrap_or_else(Local::now);
                    }
                    // Sender dropped: stop requested.
                    None => break,
                },
                _ = ticker.tick() => {
                    let draw = rand::thread_rng().gen::<f64>();
                    match evaluate_idle(Local::now(), last_activity, &self.opts, draw) {
                        IdleCheck::Recall => {
                            recall_now(
                                self.transport.clone(),
                                self.catalog.clone(),
                                self.history.clone(),
                                self.languages.clone(),
                                self.chat_id,
                            )
                            .await;
                            last_activity = Local::now();
                        }
                        IdleCheck::Skipped => {
                            // One draw per idle period.
                            last_activity = Local::now();
                        }
                        IdleCheck::OutsideWindow | IdleCheck::NotIdle => {}
                    }
                }
            }
        }

        debug!(chat_id = self.chat_id, "watcher stopped");
    }

    /// Handle one inbound event: record it if admissible.
    fn observe(&self, event: &InboundEvent) {
        if !admissible(event, self.opts.min_words, self.opts.max_words) {
            return;
        }
        if let Err(err) = self.history.append(event.chat_id, event.message_id) {
            warn!(
                chat_id = event.chat_id,
                message_id = event.message_id,
                error = %err,
                "failed to remember message"
            );
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────

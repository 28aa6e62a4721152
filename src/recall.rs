//! The recall decision: which remembered message to resurface and which
//! canned phrase to send with it.
//!
//! The choice functions are pure and take the random source as an
//! argument so tests can seed them. [`recall_now`] is the orchestration
//! used both by the watcher's idle trigger and the manual `/recall`
//! command: it reads the chat's history and language, forwards a random
//! target, classifies the forwarded message, and sends a matching phrase.
//! Failures are logged here, not propagated — a failed recall is silent
//! towards the chat.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::error::RecallError;
use crate::replies::ReplyCatalog;
use crate::store::{ChatHistoryStore, ChatLanguageStore, Language};
use crate::telegram::Transport;

/// What a completed recall did, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecallOutcome {
    pub message_id: i64,
    pub phrase: String,
}

/// Pick a uniformly random target from a non-empty history.
pub fn choose_target<R: Rng>(history: &[i64], rng: &mut R) -> i64 {
    history[rng.gen_range(0..history.len())]
}

/// Pick a uniformly random phrase from a non-empty list.
pub fn choose_phrase<'a, R: Rng>(phrases: &'a [String], rng: &mut R) -> &'a str {
    &phrases[rng.gen_range(0..phrases.len())]
}

/// Forward one random remembered message and send an accompanying phrase.
pub async fn perform_recall(
    transport: &dyn Transport,
    catalog: &ReplyCatalog,
    chat_id: i64,
    history: &[i64],
    language: Language,
) -> Result<RecallOutcome, RecallError> {
    if history.is_empty() {
        return Err(RecallError::EmptyHistory);
    }

    let target = choose_target(history, &mut rand::thread_rng());
    let kind = transport.forward(chat_id, target).await?;

    let phrases = catalog.lookup(language, kind)?;
    let phrase = choose_phrase(phrases, &mut rand::thread_rng()).to_string();
    transport.send_text(chat_id, &phrase).await?;

    Ok(RecallOutcome {
        message_id: target,
        phrase,
    })
}

/// Full recall path for a chat: read state, decide, act, log.
///
/// A chat with no history yet simply does nothing. Storage and send
/// failures are logged and the attempt is abandoned; an empty reply
/// catalog entry is an operator-facing error.
pub async fn recall_now(
    transport: Arc<dyn Transport>,
    catalog: Arc<ReplyCatalog>,
    history: Arc<ChatHistoryStore>,
    languages: Arc<ChatLanguageStore>,
    chat_id: i64,
) {
    let ids = match history.read_all(chat_id) {
        Ok(Some(ids)) if !ids.is_empty() => ids,
        Ok(_) => {
            debug!(chat_id, "nothing remembered yet, skipping recall");
            return;
        }
        Err(err) => {
            warn!(chat_id, error = %err, "failed to read history, skipping recall");
            return;
        }
    };

    let language = languages.language_or_default(chat_id);

    match perform_recall(transport.as_ref(), catalog.as_ref(), chat_id, &ids, language).await {
        Ok(outcome) => {
            info!(chat_id, message_id = outcome.message_id, "recalled a message");
        }
        Err(RecallError::Catalog(err)) => {
            // Deployment defect: the operator shipped an incomplete
            // dictionary. Loud, but local to this attempt.
            error!(chat_id, error = %err, "reply catalog is unusable for this recall");
        }
        Err(err) => {
            warn!(chat_id, error = %err, "recall abandoned");
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────

//! Shared fakes for the test modules.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SendError;
use crate::replies::{ReplyCatalog, ReplyKind};
use crate::store::Language;
use crate::telegram::Transport;

/// A recording transport fake. Configured with the kind every forward
/// reports and whether calls should fail.
pub struct MockTransport {
    pub kind: ReplyKind,
    pub fail_forward: bool,
    pub sent: Mutex<Vec<(i64, String)>>,
    pub forwarded: Mutex<Vec<(i64, i64)>>,
}

impl MockTransport {
    pub fn new(kind: ReplyKind) -> Self {
        Self {
            kind,
            fail_forward: false,
            sent: Mutex::new(Vec::new()),
            forwarded: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: ReplyKind) -> Self {
        Self {
            fail_forward: true,
            ..Self::new(kind)
        }
    }

    pub fn sent_texts(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn forwarded_ids(&self) -> Vec<(i64, i64)> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn forward(&self, chat_id: i64, message_id: i64) -> Result<ReplyKind, SendError> {
        if self.fail_forward {
            return Err(SendError::Api("forward refused by fake".to_string()));
        }
        self.forwarded.lock().unwrap().push((chat_id, message_id));
        Ok(self.kind)
    }
}

/// A catalog with one phrase per language and kind, enough for recall
/// paths in tests.
pub fn catalog_with_one_phrase_each() -> ReplyCatalog {
    let mut catalog = ReplyCatalog::empty();
    catalog.insert(
        Language::En,
        vec!["remember this?".to_string()],
        vec!["look at this again".to_string()],
    );
    catalog.insert(
        Language::Ru,
        vec!["помните это?".to_string()],
        vec!["взгляните ещё раз".to_string()],
    );
    catalog
}

//! Telegram Bot API client using HTTP long-polling.
//!
//! Long-polling keeps deployment simple — no public IP or TLS certificate
//! is needed. The bot calls `getUpdates` with a server-side timeout and
//! dispatches whatever arrives.
//!
//! The rest of the crate consumes this module through the [`Transport`]
//! trait ("send text", "forward message"), so the recall path can be
//! tested against a recording fake.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::SendError;
use crate::replies::ReplyKind;

// ── Telegram API types ──────────────────────────────────────────

/// A Telegram Update object (subset of fields we need).
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Unique identifier for this update.
    pub update_id: i64,
    /// New incoming message (present when the update is a message).
    pub message: Option<Message>,
}

/// A Telegram Message object (subset of fields we need).
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Unique message identifier within this chat.
    pub message_id: i64,
    /// Sender of the message.
    pub from: Option<User>,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Actual text of the message (if it is a text message).
    pub text: Option<String>,
    /// Date the message was sent (Unix timestamp).
    pub date: i64,
    /// Available photo sizes (present when the message is a photo).
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

impl Message {
    /// The bot command carried by this message, if any: the leading
    /// `/word`, with an optional `@botname` suffix stripped.
    pub fn command(&self) -> Option<&str> {
        let first = self.text.as_deref()?.split_whitespace().next()?;
        let command = first.strip_prefix('/')?;
        let command = command.split('@').next().unwrap_or(command);
        (!command.is_empty()).then_some(command)
    }

    /// The kind of this message for reply-phrase selection.
    pub fn kind(&self) -> ReplyKind {
        if self.photo.is_some() {
            ReplyKind::Photo
        } else {
            ReplyKind::Text
        }
    }
}

/// A Telegram User object (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// A Telegram Chat object (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl Chat {
    /// Broadcast channels are never recorded or replied to.
    pub fn is_channel(&self) -> bool {
        self.chat_type == "channel"
    }
}

/// One size variant of a photo.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// The uniform Telegram response envelope. The `Option` fields decode
/// as `None` when absent, without a `default` attribute — that would
/// put a spurious `T: Default` bound on the derived impl.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ForwardMessageRequest {
    chat_id: i64,
    from_chat_id: i64,
    message_id: i64,
}

// ── Transport trait ─────────────────────────────────────────────

/// The outbound capabilities the core needs from the chat transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send plain text to a chat.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError>;

    /// Re-post a previously seen message into its chat and report what
    /// kind of message it turned out to be.
    async fn forward(&self, chat_id: i64, message_id: i64) -> Result<ReplyKind, SendError>;
}

// ── Telegram API client ─────────────────────────────────────────

/// Low-level client for Telegram Bot API operations.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

/// Telegram's hard limit on message length.
const MAX_MESSAGE_LEN: usize = 4096;

impl TelegramApi {
    /// Create a new client for the given bot token.
    pub fn new(bot_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .context("failed to build HTTP client for Telegram API")?;

        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, SendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Api(format!("{method} returned HTTP {status}: {body}")));
        }

        let parsed: ApiResponse<T> = response.json().await?;
        if !parsed.ok {
            return Err(SendError::Api(format!(
                "{method} returned ok=false: {}",
                parsed.description.unwrap_or_default()
            )));
        }
        parsed
            .result
            .ok_or_else(|| SendError::Api(format!("{method} returned ok=true without a result")))
    }

    /// Poll for new updates using long-polling.
    ///
    /// `offset` is the ID of the first update to return; pass the last
    /// received `update_id + 1` to acknowledge previous updates. `timeout`
    /// is how long Telegram holds the connection open (seconds).
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: u64,
    ) -> Result<Vec<Update>, SendError> {
        self.call("getUpdates", &GetUpdatesRequest { timeout, offset })
            .await
    }

    /// Send markdown-formatted text (used for the welcome message).
    pub async fn send_markdown(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        let _: Message = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id,
                    text,
                    parse_mode: Some("Markdown"),
                },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramApi {
    /// Send a text message, splitting at Telegram's 4096-char limit.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let _: Message = self
                .call(
                    "sendMessage",
                    &SendMessageRequest {
                        chat_id,
                        text: &chunk,
                        parse_mode: None,
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn forward(&self, chat_id: i64, message_id: i64) -> Result<ReplyKind, SendError> {
        let forwarded: Message = self
            .call(
                "forwardMessage",
                &ForwardMessageRequest {
                    chat_id,
                    from_chat_id: chat_id,
                    message_id,
                },
            )
            .await?;
        Ok(forwarded.kind())
    }
}

// ── Utility functions ───────────────────────────────────────────

/// Split a message into chunks that fit within Telegram's character limit.
///
/// Tries to split at newline boundaries for readability. Falls back to
/// splitting at the limit, stepping back to the previous `char` boundary
/// so multi-byte text (e.g. a Russian phrase) never splits mid-character.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut boundary = max_len;
        while !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }
        let split_at = remaining[..boundary]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(boundary);

        chunks.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────

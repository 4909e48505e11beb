//! Service layer for the relay.
//!
//! This module contains the collaborator boundaries:
//! - Row fetching (`RowFetcher`, implemented by `SheetsClient`)
//! - Chat delivery (`ChatClient`, implemented by `DiscordClient`)
//! - Message rendering and sending (`Announcer`)

mod announcer;
mod discord;
mod sheets;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::{BotUser, Channel, Sheet};

pub use announcer::{Announcer, MentionSkip, MentionTarget};
pub use discord::DiscordClient;
pub use sheets::SheetsClient;

/// Source of form responses.
#[async_trait]
pub trait RowFetcher: Send + Sync {
    /// Fetch the full current table. Line 0 of the source is the header.
    async fn fetch(&self) -> Result<Sheet>;
}

/// Chat platform operations the relay needs.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// The connected bot account. Succeeds once the client is ready.
    async fn current_user(&self) -> Result<BotUser>;

    /// Look up a channel by id.
    async fn resolve_channel(&self, channel_id: u64) -> Result<Channel>;

    /// Post a message into a channel.
    async fn send_message(&self, channel: &Channel, message: &OutgoingMessage) -> Result<()>;
}

/// A message as posted to the chat platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
}

impl OutgoingMessage {
    /// Plain text message.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// A titled panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
}

/// Restricts which mentions in a message actually ping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
    pub users: Vec<String>,
}

impl AllowedMentions {
    /// Only ping the listed users.
    pub fn users<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            parse: Vec::new(),
            users: ids.into_iter().map(|id| id.to_string()).collect(),
        }
    }
}

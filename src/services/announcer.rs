// src/services/announcer.rs

//! Message rendering and delivery.
//!
//! Two message kinds are produced for a new row:
//! - a broadcast embed listing the row's fields, posted to the main channel
//! - a mention addressed to the row's recipient, posted to the mention channel

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};

use crate::error::Result;
use crate::models::{Channel, FieldConfig, MessageConfig, Row};
use crate::services::{AllowedMentions, ChatClient, Embed, OutgoingMessage};
use crate::utils::is_numeric_id;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("static regex"));

/// Fill `{key}` placeholders in one pass. Substituted values are never
/// rescanned; unknown placeholders are left as written.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

/// Recipient of a mention message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionTarget {
    pub recipient_id: String,
    pub display_name: String,
}

/// Why a row gets no mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionSkip {
    MissingRecipient,
    InvalidRecipient(String),
    MissingName,
}

impl fmt::Display for MentionSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRecipient => f.write_str("recipient id missing"),
            Self::InvalidRecipient(v) => write!(f, "recipient id '{}' is not numeric", v),
            Self::MissingName => f.write_str("display name missing"),
        }
    }
}

/// Renders rows into chat messages and sends them.
pub struct Announcer {
    chat: Arc<dyn ChatClient>,
    fields: FieldConfig,
    messages: MessageConfig,
}

impl Announcer {
    pub fn new(chat: Arc<dyn ChatClient>, fields: FieldConfig, messages: MessageConfig) -> Self {
        Self {
            chat,
            fields,
            messages,
        }
    }

    /// Decide whether a row qualifies for a mention.
    ///
    /// The recipient cell must consist of digits only, with no padding, and
    /// the display name must be non-empty. Both are taken as typed.
    pub fn mention_target(&self, row: &Row) -> std::result::Result<MentionTarget, MentionSkip> {
        let recipient = row
            .get(&self.fields.recipient)
            .filter(|v| !v.is_empty())
            .ok_or(MentionSkip::MissingRecipient)?;
        if !is_numeric_id(recipient) {
            return Err(MentionSkip::InvalidRecipient(recipient.to_string()));
        }
        let name = row
            .get(&self.fields.display_name)
            .filter(|v| !v.is_empty())
            .ok_or(MentionSkip::MissingName)?;

        Ok(MentionTarget {
            recipient_id: recipient.to_string(),
            display_name: name.to_string(),
        })
    }

    /// Render the broadcast embed for a row.
    ///
    /// The recipient column is never listed. The identity column is hidden
    /// unless `fields.show_identity` is set.
    pub fn broadcast_message(&self, row: &Row, identity_column: Option<&str>) -> OutgoingMessage {
        let hidden_identity = identity_column.filter(|_| !self.fields.show_identity);
        let description = row
            .iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case(&self.fields.recipient))
            .filter(|(key, _)| Some(*key) != hidden_identity)
            .map(|(key, value)| format!("{} **{}**: {}", self.marker(), key, value))
            .collect::<Vec<_>>()
            .join("\n");

        OutgoingMessage {
            embeds: vec![Embed {
                title: self.messages.broadcast_title.clone(),
                description,
                color: self.messages.broadcast_color,
            }],
            allowed_mentions: Some(AllowedMentions::default()),
            ..OutgoingMessage::default()
        }
    }

    /// Render the mention message.
    pub fn mention_message(&self, target: &MentionTarget) -> OutgoingMessage {
        let contact = self.messages.contact_id.to_string();
        let content = render(
            &self.messages.mention_template,
            &[
                ("emblem", &self.messages.emblem),
                ("name", &target.display_name),
                ("recipient", &target.recipient_id),
                ("contact", &contact),
            ],
        );

        OutgoingMessage {
            content: Some(content),
            allowed_mentions: Some(AllowedMentions::users([
                target.recipient_id.clone(),
                self.messages.contact_id.to_string(),
            ])),
            ..OutgoingMessage::default()
        }
    }

    /// Render the test-mention acknowledgment, or the "not found" notice.
    pub fn test_mention_message(&self, recipient_id: Option<&str>) -> OutgoingMessage {
        match recipient_id {
            Some(id) => OutgoingMessage {
                content: Some(render(&self.messages.test_mention_found, &[("recipient", id)])),
                allowed_mentions: Some(AllowedMentions::users([id])),
                ..OutgoingMessage::default()
            },
            None => OutgoingMessage::text(self.messages.test_mention_missing.clone()),
        }
    }

    pub async fn send_broadcast(
        &self,
        channel: &Channel,
        row: &Row,
        identity_column: Option<&str>,
    ) -> Result<()> {
        let message = self.broadcast_message(row, identity_column);
        self.chat.send_message(channel, &message).await
    }

    pub async fn send_mention(&self, channel: &Channel, target: &MentionTarget) -> Result<()> {
        let message = self.mention_message(target);
        self.chat.send_message(channel, &message).await
    }

    pub async fn send(&self, channel: &Channel, message: &OutgoingMessage) -> Result<()> {
        self.chat.send_message(channel, message).await
    }

    pub fn recipient_field(&self) -> &str {
        &self.fields.recipient
    }

    fn marker(&self) -> &str {
        match self.messages.markers.len() {
            0 => "",
            n => &self.messages.markers[rand::random_range(0..n)],
        }
    }
}

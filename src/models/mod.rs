// src/models/mod.rs

//! Domain models for the relay.
//!
//! This module contains the data structures shared by the fetcher, the
//! ledger and the announcer.

mod config;
mod identity;
mod row;

// Re-export all public types
pub use config::{
    Config, DedupConfig, DiscordConfig, FieldConfig, GoogleCredentials, HttpConfig,
    LoggingConfig, MessageConfig, PolicyKind, PollConfig, SheetsConfig, env,
};
pub use identity::{IdentityKey, IdentityPolicy, RowIdentity};
pub use row::{Row, Sheet};

/// A Discord channel the relay posts into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u64,
    pub name: Option<String>,
}

/// The bot account the chat client is connected as.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

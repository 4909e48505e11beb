// src/error.rs

//! Unified error handling for the relay.

use std::fmt;

use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Spreadsheet fetch error
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The sheet header has no column usable as row identity
    #[error("Identity column {column} not found in header {headers:?}")]
    MissingIdentityColumn {
        column: String,
        headers: Vec<String>,
    },

    /// A configured channel could not be resolved
    #[error("Channel {0} not found")]
    ChannelNotFound(u64),

    /// Chat platform error
    #[error("Chat error for {context}: {message}")]
    Chat { context: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }

    /// Create a chat error with context.
    pub fn chat(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Chat {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error should stop the process at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Validation(_))
    }
}

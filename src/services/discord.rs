// src/services/discord.rs

//! Discord chat client over the REST API.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{BotUser, Channel, DiscordConfig};
use crate::services::{ChatClient, OutgoingMessage};
use crate::utils::http::{check_status, endpoint};

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    #[serde(default)]
    name: Option<String>,
}

/// Discord bot client.
///
/// Channels are cached after the first successful lookup.
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
    channels: RwLock<HashMap<u64, Channel>>,
}

impl DiscordClient {
    pub fn new(client: Client, config: &DiscordConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.clone(),
            token: config.token.clone(),
            channels: RwLock::new(HashMap::new()),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    fn cached(&self, channel_id: u64) -> Option<Channel> {
        self.channels
            .read()
            .ok()
            .and_then(|c| c.get(&channel_id).cloned())
    }
}

#[async_trait]
impl ChatClient for DiscordClient {
    async fn current_user(&self) -> Result<BotUser> {
        let url = endpoint(&self.api_base, &["users", "@me"])?;
        let response = self.authorized(self.client.get(url)).send().await?;
        let response = check_status(response, |m| AppError::chat("users/@me", m)).await?;
        Ok(response.json().await?)
    }

    async fn resolve_channel(&self, channel_id: u64) -> Result<Channel> {
        if let Some(channel) = self.cached(channel_id) {
            return Ok(channel);
        }

        let id = channel_id.to_string();
        let url = endpoint(&self.api_base, &["channels", id.as_str()])?;
        let response = self.authorized(self.client.get(url)).send().await?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN
        ) {
            return Err(AppError::ChannelNotFound(channel_id));
        }
        let response = check_status(response, |m| AppError::chat("channels", m)).await?;
        let body: ChannelResponse = response.json().await?;

        let channel = Channel {
            id: channel_id,
            name: body.name,
        };
        if let Ok(mut cache) = self.channels.write() {
            cache.insert(channel_id, channel.clone());
        }
        Ok(channel)
    }

    async fn send_message(&self, channel: &Channel, message: &OutgoingMessage) -> Result<()> {
        let id = channel.id.to_string();
        let url = endpoint(&self.api_base, &["channels", id.as_str(), "messages"])?;
        let response = self
            .authorized(self.client.post(url))
            .json(message)
            .send()
            .await?;
        check_status(response, |m| AppError::chat(format!("channel {}", channel.id), m)).await?;
        Ok(())
    }
}

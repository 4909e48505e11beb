// src/pipeline/relay.rs

//! Relay assembly: builds the collaborators from configuration and exposes
//! the entry points used by the CLI.

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{BotUser, Config};
use crate::pipeline::command::run_test_mention;
use crate::pipeline::ledger::Ledger;
use crate::pipeline::poll::{Poller, TickReport};
use crate::services::{Announcer, ChatClient, DiscordClient, RowFetcher, SheetsClient};
use crate::storage::{LedgerStore, LocalStorage};
use crate::utils::http;

/// A configured relay.
pub struct Relay {
    config: Config,
    fetcher: Arc<dyn RowFetcher>,
    chat: Arc<dyn ChatClient>,
}

impl Relay {
    /// Validate the configuration and build the Sheets and Discord clients.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let client = http::create_client(&config.http)?;
        let fetcher = Arc::new(SheetsClient::new(
            client.clone(),
            &config.sheets,
            &config.google,
        ));
        let chat = Arc::new(DiscordClient::new(client, &config.discord));
        Ok(Self::with_clients(config, fetcher, chat))
    }

    /// Assemble a relay around existing collaborators.
    pub fn with_clients(
        config: Config,
        fetcher: Arc<dyn RowFetcher>,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            config,
            fetcher,
            chat,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn announcer(&self) -> Announcer {
        Announcer::new(
            Arc::clone(&self.chat),
            self.config.fields.clone(),
            self.config.messages.clone(),
        )
    }

    fn store(&self) -> Option<Arc<dyn LedgerStore>> {
        self.config
            .dedup
            .state_file
            .as_ref()
            .map(|path| Arc::new(LocalStorage::new(path)) as Arc<dyn LedgerStore>)
    }

    /// Check the bot token. The poller only starts after this succeeds.
    pub async fn connect(&self) -> Result<BotUser> {
        let user = self.chat.current_user().await?;
        log::info!("Connected to Discord as {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Load the ledger and build a poller around it.
    pub async fn poller(&self) -> Poller {
        let ledger = Ledger::load(self.config.dedup.identity_policy(), self.store()).await;
        if !ledger.is_persistent() {
            log::info!("Ledger persistence disabled; announced rows are kept in memory only");
        }
        Poller::new(
            &self.config,
            Arc::clone(&self.fetcher),
            Arc::clone(&self.chat),
            self.announcer(),
            ledger,
        )
    }

    /// Connect, then poll until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<Ledger>
    where
        F: Future<Output = ()>,
    {
        self.connect().await?;
        let poller = self.poller().await;
        Ok(poller.run_until(shutdown).await)
    }

    /// Connect and run a single tick.
    pub async fn run_once(&self) -> Result<TickReport> {
        self.connect().await?;
        let mut poller = self.poller().await;
        Ok(poller.tick().await)
    }

    /// Post the test mention to the main channel.
    pub async fn test_mention(&self) -> Result<Option<String>> {
        run_test_mention(
            self.fetcher.as_ref(),
            self.chat.as_ref(),
            &self.announcer(),
            self.config.discord.main_channel_id,
        )
        .await
    }
}

// src/pipeline/poll.rs

//! Poll cycle controller.
//!
//! Each tick resolves both channels, fetches the sheet, filters it through
//! the ledger and announces every unseen row. Every external call has its
//! own failure boundary: a failed tick is logged and retried on the next
//! interval, never propagated.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::{Channel, Config};
use crate::pipeline::ledger::{Ledger, UnseenRow};
use crate::services::{Announcer, ChatClient, RowFetcher};

/// Why a tick did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A destination channel could not be resolved
    ChannelUnavailable,
    /// The sheet could not be fetched
    FetchFailed,
    /// The header lacks the identity column
    NoIdentityColumn,
}

/// Outcome of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickStatus {
    /// Fetched fine, nothing new
    #[default]
    Idle,
    /// At least one new row was processed
    Announced,
    /// Tick aborted before any send
    Skipped(SkipReason),
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub status: TickStatus,
    pub fetched: usize,
    pub new_rows: usize,
    pub blank_identities: usize,
    pub broadcasts_sent: usize,
    pub broadcast_failures: usize,
    pub mentions_sent: usize,
    pub mention_failures: usize,
    pub mentions_skipped: usize,
    pub committed: usize,
    pub persist_failures: usize,
}

impl TickReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            status: TickStatus::Skipped(reason),
            ..Self::default()
        }
    }

    /// Total messages delivered.
    pub fn sends(&self) -> usize {
        self.broadcasts_sent + self.mentions_sent
    }

    fn log(&self) {
        match self.status {
            TickStatus::Idle => log::debug!("Tick: {} rows, nothing new", self.fetched),
            TickStatus::Skipped(reason) => log::debug!("Tick skipped: {:?}", reason),
            TickStatus::Announced => log::info!(
                "Tick: {} new of {} rows, {} broadcast ({} failed), \
                 {} mentions ({} failed, {} skipped), {} committed",
                self.new_rows,
                self.fetched,
                self.broadcasts_sent,
                self.broadcast_failures,
                self.mentions_sent,
                self.mention_failures,
                self.mentions_skipped,
                self.committed
            ),
        }
    }
}

/// Drives the fetch, filter, announce, commit cycle.
///
/// Owns the ledger. `tick` takes `&mut self`, so two ticks can never run at
/// once.
pub struct Poller {
    fetcher: Arc<dyn RowFetcher>,
    chat: Arc<dyn ChatClient>,
    announcer: Announcer,
    ledger: Ledger,
    main_channel_id: u64,
    mention_channel_id: u64,
    interval: Duration,
}

impl Poller {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn RowFetcher>,
        chat: Arc<dyn ChatClient>,
        announcer: Announcer,
        ledger: Ledger,
    ) -> Self {
        Self {
            fetcher,
            chat,
            announcer,
            ledger,
            main_channel_id: config.discord.main_channel_id,
            mention_channel_id: config.discord.mention_channel_id,
            interval: Duration::from_secs(config.poll.interval_secs),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    async fn resolve_channels(&self) -> Result<(Channel, Channel)> {
        let main = self.chat.resolve_channel(self.main_channel_id).await?;
        let mention = self.chat.resolve_channel(self.mention_channel_id).await?;
        Ok((main, mention))
    }

    /// Run one poll cycle.
    pub async fn tick(&mut self) -> TickReport {
        let (main, mention) = match self.resolve_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                log::error!("Channel resolution failed, skipping tick: {}", e);
                return TickReport::skipped(SkipReason::ChannelUnavailable);
            }
        };

        let sheet = match self.fetcher.fetch().await {
            Ok(sheet) => sheet,
            Err(e) => {
                log::error!("Fetching responses failed, skipping tick: {}", e);
                return TickReport::skipped(SkipReason::FetchFailed);
            }
        };

        let unseen = match self.ledger.filter_unseen(&sheet) {
            Ok(unseen) => unseen,
            Err(e) => {
                log::error!("Cannot identify rows, skipping tick: {}", e);
                return TickReport::skipped(SkipReason::NoIdentityColumn);
            }
        };

        let mut report = TickReport {
            fetched: sheet.rows.len(),
            new_rows: unseen.rows.len(),
            blank_identities: unseen.blank,
            ..TickReport::default()
        };
        if unseen.blank > 0 {
            log::warn!(
                "{} rows have a blank identity and were left for a later tick",
                unseen.blank
            );
        }
        if unseen.rows.is_empty() {
            return report;
        }
        report.status = TickStatus::Announced;

        let identity_column = unseen.identity_column().map(str::to_string);
        for unseen_row in unseen.rows {
            let column = identity_column.as_deref();
            self.announce(&main, &mention, unseen_row, column, &mut report).await;
        }
        report
    }

    /// Announce one row and commit it.
    ///
    /// The row is committed whatever happened to its sends, so a delivery
    /// failure never causes a re-announcement loop.
    async fn announce(
        &mut self,
        main: &Channel,
        mention: &Channel,
        unseen: UnseenRow,
        identity_column: Option<&str>,
        report: &mut TickReport,
    ) {
        let UnseenRow { row, identity } = unseen;

        match self.announcer.send_broadcast(main, &row, identity_column).await {
            Ok(()) => report.broadcasts_sent += 1,
            Err(e) => {
                report.broadcast_failures += 1;
                log::error!("Broadcast for row {} failed: {}", identity, e);
            }
        }

        match self.announcer.mention_target(&row) {
            Ok(target) => {
                log::info!("Mentioning user {}", target.recipient_id);
                match self.announcer.send_mention(mention, &target).await {
                    Ok(()) => report.mentions_sent += 1,
                    Err(e) => {
                        report.mention_failures += 1;
                        log::error!("Mention for row {} failed: {}", identity, e);
                    }
                }
            }
            Err(skip) => {
                report.mentions_skipped += 1;
                log::warn!("No mention for row {}: {}", identity, skip);
            }
        }

        match self.ledger.commit(identity.clone()).await {
            Ok(_) => report.committed += 1,
            Err(e) => {
                report.committed += 1;
                report.persist_failures += 1;
                log::error!("Persisting ledger after row {} failed: {}", identity, e);
            }
        }
    }

    /// Tick on the configured interval until `shutdown` resolves.
    ///
    /// Each tick is awaited inside the loop; if one overruns the interval the
    /// missed ticks are dropped rather than bunched up.
    pub async fn run_until<F>(mut self, shutdown: F) -> Ledger
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        log::info!(
            "Polling every {}s ({} identity, {} rows already announced)",
            self.interval.as_secs(),
            self.ledger.policy(),
            self.ledger.len()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, stopping poller");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await.log();
                }
            }
        }
        self.ledger
    }
}

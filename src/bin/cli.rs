//! Form Relay CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use form_relay::{
    error::Result,
    models::Config,
    pipeline::{Relay, TickStatus},
    storage::{LedgerStore, LocalStorage},
};

/// Form Relay - announces new form responses on Discord
#[derive(Parser, Debug)]
#[command(
    name = "form-relay",
    version,
    about = "Relays new spreadsheet form responses to Discord"
)]
struct Cli {
    /// Path to the TOML config file (optional; environment variables override it)
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the sheet and announce new rows until interrupted
    Run,

    /// Run a single poll cycle and exit
    Once,

    /// Mention the latest respondent in the main channel
    TestMention,

    /// Validate configuration
    Validate,

    /// Show persisted ledger info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(&cli.config)?;
    init_logging(cli.verbose, &config.logging.level);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            log::info!("Form relay starting...");
            let relay = Relay::from_config(config)?;
            let ledger = relay.run_until(shutdown_signal()).await?;
            log::info!("Stopped with {} announced rows", ledger.len());
        }

        Command::Once => {
            let relay = Relay::from_config(config)?;
            let report = relay.run_once().await?;
            log::info!(
                "Tick {:?}: {} new rows, {} messages sent",
                report.status,
                report.new_rows,
                report.sends()
            );
            if matches!(report.status, TickStatus::Skipped(_)) {
                std::process::exit(1);
            }
        }

        Command::TestMention => {
            let relay = Relay::from_config(config)?;
            match relay.test_mention().await? {
                Some(id) => log::info!("Mentioned user {}", id),
                None => log::warn!("No valid recipient id in the sheet"),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (identity policy: {})", config.dedup.identity_policy());
        }

        Command::Info => {
            log::info!("Identity policy: {}", config.dedup.identity_policy());
            log::info!("Poll interval: {}s", config.poll.interval_secs);

            match &config.dedup.state_file {
                Some(path) => {
                    let storage = LocalStorage::new(path);
                    match storage.load().await {
                        Ok(Some(snapshot)) => {
                            log::info!("Ledger: {} ({} rows)", path.display(), snapshot.count);
                            log::info!("Last updated: {}", snapshot.updated_at);
                        }
                        Ok(None) => log::info!("No ledger at {} yet.", path.display()),
                        Err(e) => log::warn!("Ledger at {} is unreadable: {}", path.display(), e),
                    }
                }
                None => log::info!("Ledger persistence disabled."),
            }
        }
    }

    Ok(())
}

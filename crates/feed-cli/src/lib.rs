//! Live Alert Feed CLI
//!
//! Terminal display surface for the live alert feed: argument parsing,
//! logging setup, and the watch/health commands.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use live_feed::{ApiClient, FeedConfig, FeedSnapshot, FeedState, LiveAlertFeed};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod printer;

pub use printer::{DisplayMode, FeedPrinter};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "alert-feed", version, about = "Live risk alert feed")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Alert server base URL (overrides ALERT_FEED_API_BASE_URL)
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: Level,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream alerts to the terminal (default)
    Watch(WatchArgs),
    /// Check that the alert server is up
    Health,
}

/// Options for `watch`
#[derive(Debug, Default, Args)]
pub struct WatchArgs {
    /// How updates are printed
    #[arg(long, value_enum, default_value_t = DisplayMode::Lines)]
    pub mode: DisplayMode,

    /// Seed the feed from the server's alert history
    #[arg(long)]
    pub backfill: bool,

    /// Close the feed when the stream drops instead of reconnecting
    #[arg(long)]
    pub no_reconnect: bool,
}

/// Initialize logging (to stderr, stdout carries the feed)
pub fn init_logging(level: Level, json: bool) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("Failed to set tracing subscriber")
}

/// Run the selected command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = FeedConfig::load(cli.config.as_deref(), cli.api_base_url.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Health) => health(&config).await,
        Some(Command::Watch(args)) => watch(config, args).await,
        None => watch(config, WatchArgs::default()).await,
    }
}

/// Stream alerts until Ctrl-C or until the feed closes on its own
async fn watch(mut config: FeedConfig, args: WatchArgs) -> anyhow::Result<()> {
    if args.backfill {
        config.backfill_history = true;
    }
    if args.no_reconnect {
        config.reconnect = false;
    }

    let feed = LiveAlertFeed::new(&config).context("Failed to create alert feed")?;
    let stream_url = feed.stream_url().to_string();
    info!("Subscribing to {}", stream_url);

    let handle = feed.activate();
    let mut printer = FeedPrinter::new(args.mode, std::io::stdout());
    printer.render(&handle.snapshot())?;

    let interrupted = follow(handle.subscribe(), &mut printer, tokio::signal::ctrl_c()).await?;
    if interrupted {
        info!("Interrupted, closing alert feed");
    }

    let last = handle.close().await?;
    info!(
        "Feed closed: {} alerts, {} malformed, {} reconnects",
        last.stats.alerts_accepted, last.stats.malformed_dropped, last.stats.reconnects
    );

    if !interrupted {
        warn!("Alert stream closed by the transport");
        bail!("Alert stream at {} closed", stream_url);
    }
    Ok(())
}

/// Print updates until `interrupt` resolves or the feed closes
///
/// Returns `true` when interrupted. The interrupt future lives across
/// iterations so a signal arriving mid-render is not lost.
pub async fn follow<W, F>(
    mut updates: tokio::sync::watch::Receiver<FeedSnapshot>,
    printer: &mut FeedPrinter<W>,
    interrupt: F,
) -> anyhow::Result<bool>
where
    W: Write,
    F: Future,
{
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => return Ok(true),
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(false);
                }
                let snapshot = updates.borrow_and_update().clone();
                printer.render(&snapshot)?;
                if snapshot.state == FeedState::Closed {
                    return Ok(false);
                }
            }
        }
    }
}

/// Probe the server's health endpoint
async fn health(config: &FeedConfig) -> anyhow::Result<()> {
    let client = ApiClient::new(config)?;
    if client.health().await? {
        println!("ok");
        Ok(())
    } else {
        bail!("Alert server at {} is not healthy", config.api_base_url)
    }
}

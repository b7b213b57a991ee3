//! jobwatch CLI
//!
//! Polls the listings feed and relays new postings to Discord webhooks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jobwatch::{
    config,
    error::Result,
    models::Config,
    pipeline::{self, CycleReport, Relay},
    services::{Channel, DiscordWebhook, FileSource, GitHubListingSource, SnapshotSource},
    storage::{LocalStorage, SnapshotStore},
    utils::http,
};
use tokio_util::sync::CancellationToken;

/// jobwatch - Job Posting Change Relay
#[derive(Parser, Debug)]
#[command(
    name = "jobwatch",
    version,
    about = "Relays new job postings to Discord webhooks"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the storage directory from the config file
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Read listings from a local JSON file instead of GitHub
    #[arg(long)]
    listings_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll on the configured interval until Ctrl-C
    Run {
        /// Override the poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Run a single cycle and exit
    Once,

    /// Validate configuration
    Validate,

    /// Show stored snapshot info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Assemble the relay from validated configuration.
fn build_relay(config: &Config) -> Result<Relay> {
    let client = http::create_async_client(&config.http)?;

    let source: Arc<dyn SnapshotSource> = match &config.source.file {
        Some(path) => Arc::new(FileSource::new(path)),
        None => Arc::new(GitHubListingSource::new(client.clone(), &config.source)),
    };
    let store: Arc<dyn SnapshotStore> = Arc::new(LocalStorage::new(&config.storage.dir));
    let channels: Vec<Arc<dyn Channel>> =
        DiscordWebhook::from_urls(&client, &config.channels.webhook_urls)?
            .into_iter()
            .map(|c| Arc::new(c) as Arc<dyn Channel>)
            .collect();

    Relay::new(config.relay.clone(), source, store, channels)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = config::load_with_env(&cli.config)?;
    if let Some(dir) = &cli.storage_dir {
        config.storage.dir = dir.clone();
    }
    if let Some(file) = &cli.listings_file {
        config.source.file = Some(file.clone());
    }

    match cli.command {
        Command::Run { interval } => {
            config::validate(&config)?;
            let relay = build_relay(&config)?;
            let interval =
                Duration::from_secs(interval.unwrap_or(config.relay.poll_interval_secs).max(1));

            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Shutdown requested; finishing current cycle");
                    signal.cancel();
                }
            });

            let stats = pipeline::run_polling(&relay, interval, shutdown).await;
            log::info!(
                "Done: {} cycles, {} failed, {} postings reported",
                stats.cycles,
                stats.failed_cycles,
                stats.events
            );
        }

        Command::Once => {
            config::validate(&config)?;
            let relay = build_relay(&config)?;
            match pipeline::run_once(&relay).await? {
                CycleReport::Dispatched(summary) if summary.failed_deliveries() > 0 => {
                    log::warn!("Some deliveries failed; see log above");
                }
                _ => {}
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config::validate(&config) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} channel(s), batch size {}, every {}s, reactivated postings {})",
                config.channels.webhook_urls.len(),
                config.relay.max_batch_size,
                config.relay.poll_interval_secs,
                if config.relay.include_reactivated {
                    "included"
                } else {
                    "ignored"
                }
            );
        }

        Command::Info => {
            let dir = &config.storage.dir;
            let storage = LocalStorage::new(dir);
            log::info!("Storage directory: {}", dir.display());

            match storage.info().await? {
                Some(stored) => {
                    log::info!("Stored snapshot: {} postings", stored.count);
                    log::info!("Last updated: {}", stored.updated_at);
                    let active = stored.postings.iter().filter(|p| p.active).count();
                    log::info!("Active postings: {}", active);
                }
                None => log::info!("No snapshot found yet. The next cycle stores a baseline."),
            }
        }
    }

    Ok(())
}

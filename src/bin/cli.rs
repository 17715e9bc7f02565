//! UPME Monitor CLI
//!
//! One invocation is one monitoring pass; cadence belongs to the external
//! scheduler. Credentials come from the environment.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use upme_monitor::{
    error::Result,
    models::Config,
    pipeline::{Monitor, RunStatus},
    services::Notifier,
    storage::{LocalStorage, SnapshotStore, StateLoad},
    utils::http::HttpPageSource,
};

/// UPME Monitor - listing change notifier
#[derive(Parser, Debug)]
#[command(
    name = "upme-monitor",
    version,
    about = "Detects added or removed announcements on a listing page"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "monitor.toml")]
    config: PathBuf,

    /// Override the monitored URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Override the state file path
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, compare, notify and persist (default)
    Run,

    /// Fetch and print extracted records without persisting
    Preview,

    /// Validate configuration and show enabled channels
    Validate,

    /// Show the persisted snapshot
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Build the immutable configuration: file, then environment, then flags.
fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();

    if let Some(url) = &cli.url {
        config.monitor.url = url.clone();
    }
    if let Some(state) = &cli.state {
        config.monitor.state_file = state.clone();
    }
    config
}

fn channel_banner(config: &Config) {
    let state = |enabled: bool| if enabled { "enabled" } else { "disabled" };
    log::info!("Telegram: {}", state(config.telegram.is_enabled()));
    log::info!("Email: {}", state(config.email.is_enabled()));
}

fn build_monitor(config: Config) -> Result<Monitor> {
    let source = HttpPageSource::new(&config.http)?;
    let store = LocalStorage::new(&config.monitor.state_file);
    let notifier = Notifier::from_config(&config);
    if notifier.is_empty() {
        log::warn!("No notification channel enabled");
    } else {
        log::info!("Active channels: {}", notifier.channel_names().join(", "));
    }

    Monitor::new(config, Box::new(source), Box::new(store), notifier)
}

async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            log::info!("UPME Monitor starting...");
            channel_banner(&config);
            config.validate()?;

            let monitor = build_monitor(config)?;
            let report = monitor.run().await?;

            log::info!(
                "Run complete: {} ({} records)",
                report.status,
                report.record_count
            );
            if report.status == RunStatus::Changed {
                if let Some(delivery) = &report.delivery {
                    if delivery.attempted() == 0 {
                        log::warn!("Changes detected but no notification channel is enabled");
                    }
                }
            }
        }

        Command::Preview => {
            config.validate()?;
            let monitor = build_monitor(config)?;
            let preview = monitor.preview().await?;

            for (i, record) in preview.records.iter().enumerate() {
                let title = record.title().unwrap_or("-");
                println!("{:>3}. [{:?}] {}", i + 1, record.kind, title);
                if let Some(link) = &record.link {
                    println!("       {}", link);
                }
            }
            log::info!("Digest: {}", preview.hash);
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (url: {})", config.monitor.url);
            channel_banner(&config);
        }

        Command::Info => {
            let store = LocalStorage::new(&config.monitor.state_file);
            log::info!("State file: {}", store.location());

            match store.load().await {
                StateLoad::Found(snapshot) => {
                    log::info!("Last updated: {}", snapshot.timestamp.to_rfc3339());
                    log::info!("Digest: {}", snapshot.hash);
                    log::info!("Records: {}", snapshot.len());
                }
                StateLoad::Missing => log::info!("No snapshot found yet."),
                StateLoad::Corrupt(reason) => log::warn!("Snapshot unreadable: {}", reason),
            }
        }
    }

    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;
use omswami_events::config::{DEFAULT_CONFIG_PATH, default_sources, load_config};
use omswami_events::notifier::EmailNotifier;
use omswami_events::store::{DEFAULT_SNAPSHOT_PATH, EventStore};
use omswami_events::tracker::{InterruptOutcome, watch_interrupts};
use omswami_events::{EVENTS_URL, Tracker, WebScraper};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "omswami-events")]
#[command(about = "Emails newly listed events from omswami.org/events", long_about = None)]
struct Cli {
    #[arg(long, help = "Run a single check and exit (for cron jobs)")]
    once: bool,

    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to the config file"
    )]
    config: PathBuf,

    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_SNAPSHOT_PATH,
        help = "Path to the snapshot of previously seen events"
    )]
    data: PathBuf,

    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let config = load_config(&default_sources(&cli.config)).unwrap_or_else(|e| {
        log::error!("Configuration error: {}", e);
        process::exit(1);
    });

    let scraper = WebScraper::new().unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    let notifier = EmailNotifier::new(&config.email, EVENTS_URL).unwrap_or_else(|e| {
        log::error!("Error creating email notifier: {}", e);
        process::exit(1);
    });

    let tracker = Tracker::new(
        EVENTS_URL,
        Arc::new(scraper),
        Arc::new(notifier),
        EventStore::new(cli.data),
    );

    if cli.once {
        if !tracker.run_once().await {
            process::exit(1);
        }
        return;
    }

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, trigger).await == InterruptOutcome::Forced {
            process::exit(130);
        }
    });

    log::info!("Press Ctrl+C to stop");
    tracker
        .run_continuous(config.check_interval(), shutdown)
        .await;
}

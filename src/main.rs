//! chatheat - Activity heatmaps for SillyTavern chat histories

use chatheat::{
    aggregation::{AggregationOptions, Aggregator},
    calendar::CalendarCursor,
    cli::{Cli, Command, parse_month},
    error::{HeatmapError, Result},
    loader::HistoryLoader,
    provider::HistoryStore,
    timezone::TimezoneConfig,
    types::RawMessage,
};
use chatheat_provider_sillytavern::{FsStore, HttpStore};
use chatheat_terminal::get_formatter;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pick the store: a server when a URL is given, otherwise the data directory
async fn open_store(cli: &Cli) -> Result<Arc<dyn HistoryStore>> {
    if let Some(url) = &cli.url {
        let store = HttpStore::connect(url, Duration::from_secs(cli.timeout)).await?;
        return Ok(Arc::new(store));
    }

    let store = match &cli.data_dir {
        Some(dir) => FsStore::new(dir),
        None => FsStore::discover()?,
    };
    info!("Reading chats from {}", store.root().display());
    Ok(Arc::new(store))
}

/// Load every character, with a progress bar on interactive terminals
async fn load_global(loader: &HistoryLoader, show_progress: bool) -> Result<Vec<RawMessage>> {
    let progress = show_progress.then(|| {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} characters")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("Loading chats");
        pb
    });

    let messages = loader
        .load_global(|completed, total| {
            if let Some(pb) = &progress {
                pb.set_length(total as u64);
                pb.set_position(completed as u64);
            }
        })
        .await?;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    Ok(messages)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --verbose overrides RUST_LOG
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("chatheat=info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chatheat=warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let timezone = TimezoneConfig::from_cli(cli.timezone.as_deref(), cli.utc)?;
    info!("Using timezone: {}", timezone.display_name());

    let store = open_store(&cli).await?;
    let loader = HistoryLoader::new(store).with_config(cli.loader_config());

    let interactive = is_terminal::is_terminal(std::io::stdout());
    let colored = interactive && std::env::var("NO_COLOR").is_err();
    let formatter = get_formatter(cli.json, colored);

    let (title, messages) = match cli.command.clone().unwrap_or(Command::Global) {
        Command::Characters => {
            let characters = loader.characters().await?;
            println!("{}", formatter.format_characters(&characters));
            return Ok(());
        }
        Command::Global => {
            info!("Loading every character");
            let messages = load_global(&loader, interactive && !cli.json).await?;
            ("All characters".to_string(), messages)
        }
        Command::Character { name } => {
            let character = loader.find_character(&name).await?;
            info!("Loading history of {}", character.display_name);
            let messages = loader.load_character(&character).await;
            (character.display_name, messages)
        }
        Command::Current { name } => {
            let character = loader.find_character(&name).await?;
            info!("Loading current conversation of {}", character.display_name);
            let messages = loader.load_current(&character).await?;
            (format!("{} (current chat)", character.display_name), messages)
        }
    };
    info!("Loaded {} message records", messages.len());

    let aggregator = Aggregator::new(AggregationOptions {
        timezone,
        thresholds: cli.thresholds,
        range_end: cli.range_end,
        week_start: cli.week_start,
    });
    let Some(stats) = aggregator.aggregate(&messages, chrono::Utc::now())? else {
        warn!("No dated messages found for {}", title);
        return Ok(());
    };

    let cursor = match &cli.month {
        Some(month) => {
            let (year, month_number) = parse_month(month)?;
            CalendarCursor::seek(&stats, year, month_number).ok_or_else(|| {
                HeatmapError::InvalidArgument(format!("{month} is outside the chat history"))
            })?
        }
        None => CalendarCursor::at_offset(&stats, cli.offset),
    };

    println!(
        "{}",
        formatter.format_stats(&title, &stats, cursor.current(&stats), cli.week_start)
    );
    Ok(())
}

//! chatheat - Activity heatmaps for SillyTavern chat histories
//!
//! This library provides functionality to:
//! - Locate chat log files whose storage folder has to be guessed
//! - Load them under bounded concurrency, tolerating partial failure
//! - Normalize the many send-date encodings chat logs carry
//! - Aggregate messages into day buckets and month grids with intensity levels
//!
//! # Examples
//!
//! ```no_run
//! use chatheat::{
//!     aggregation::{AggregationOptions, Aggregator},
//!     loader::HistoryLoader,
//! };
//! use chatheat_provider_sillytavern::FsStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> chatheat::Result<()> {
//!     let loader = HistoryLoader::new(Arc::new(FsStore::discover()?));
//!     let messages = loader.load_global(|_, _| {}).await?;
//!
//!     let aggregator = Aggregator::new(AggregationOptions::default());
//!     if let Some(stats) = aggregator.aggregate(&messages, chrono::Utc::now())? {
//!         println!("{} messages over {} days", stats.total_messages, stats.active_day_count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod calendar;
pub mod cli;
pub mod loader;

pub use chatheat_core::{
    calendar_types, error, path_candidates, payload, pool, provider, timestamp, timezone, types,
};

// Re-export commonly used types
pub use error::{HeatmapError, Result};
pub use types::{CharacterId, CharacterInfo, LogFileInfo, RawMessage, RawTimestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

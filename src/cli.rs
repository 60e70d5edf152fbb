//! CLI interface for chatheat
//!
//! Defines the command-line interface using clap. Every flag is global so
//! it can be given before or after the subcommand; with no subcommand the
//! heatmap covers every character.
//!
//! # Example
//!
//! ```bash
//! # Everyone, February 2024, Monday-first grid
//! chatheat --month 2024-02 --week-start monday
//!
//! # One character against a running server
//! chatheat --url http://127.0.0.1:8000 character Seraphina --json
//!
//! # Only the open conversation
//! chatheat current Seraphina
//! ```

use crate::calendar_types::{IntensityThresholds, RangeEnd, WeekStart};
use crate::error::{HeatmapError, Result};
use crate::loader::{DEFAULT_CHARACTER_CONCURRENCY, DEFAULT_FILE_CONCURRENCY, LoaderConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Activity heatmaps for SillyTavern chat histories
#[derive(Parser, Debug, Clone)]
#[command(name = "chatheat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show informational output (default only shows warnings and errors)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// SillyTavern user data directory (e.g. ~/SillyTavern/data/default-user)
    #[arg(long, env = "SILLYTAVERN_DATA_PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Read from a running SillyTavern server instead of the filesystem
    #[arg(long, env = "SILLYTAVERN_URL", global = true)]
    pub url: Option<String>,

    /// Request timeout in seconds for server access
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,

    /// Timezone for day boundaries (e.g. "Europe/Berlin", "Asia/Tokyo", "UTC")
    /// If not specified, uses the system's local timezone
    #[arg(long, short = 'z', global = true)]
    pub timezone: Option<String>,

    /// Use UTC for day boundaries (overrides --timezone)
    #[arg(long, global = true)]
    pub utc: bool,

    /// Intensity cut points: classic, compact, gentle, or four counts like 1,20,50,100
    #[arg(long, default_value = "classic", global = true)]
    pub thresholds: IntensityThresholds,

    /// Last month of the calendar: last-message or now
    #[arg(long, default_value = "last-message", global = true)]
    pub range_end: RangeEnd,

    /// First column of the month grid: sunday or monday
    #[arg(long, default_value = "sunday", global = true)]
    pub week_start: WeekStart,

    /// Characters loaded at once
    #[arg(long, default_value_t = DEFAULT_CHARACTER_CONCURRENCY, global = true)]
    pub character_concurrency: usize,

    /// Chat files retrieved at once per character
    #[arg(long, default_value_t = DEFAULT_FILE_CONCURRENCY, global = true)]
    pub file_concurrency: usize,

    /// Month to draw (YYYY-MM); defaults to the most recent
    #[arg(long, global = true, conflicts_with = "offset")]
    pub month: Option<String>,

    /// Months back from the most recent to draw
    #[arg(long, default_value_t = 0, global = true)]
    pub offset: usize,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Concurrency limits from the command line
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            character_concurrency: self.character_concurrency.max(1),
            file_concurrency: self.file_concurrency.max(1),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Heatmap across every character (default)
    Global,

    /// Heatmap for one character's whole history
    Character {
        /// Character name, avatar file name, or id
        name: String,
    },

    /// Heatmap for one character's current conversation
    Current {
        /// Character name, avatar file name, or id
        name: String,
    },

    /// List known characters
    Characters,
}

/// Parse a `YYYY-MM` month selector
///
/// # Examples
/// ```
/// use chatheat::cli::parse_month;
///
/// assert_eq!(parse_month("2024-02").unwrap(), (2024, 2));
/// assert!(parse_month("2024-13").is_err());
/// ```
pub fn parse_month(month_str: &str) -> Result<(i32, u32)> {
    let Some((year, month)) = month_str.trim().split_once('-') else {
        return Err(HeatmapError::InvalidDate(format!(
            "Invalid month '{month_str}', expected YYYY-MM"
        )));
    };

    let year = year
        .parse::<i32>()
        .map_err(|_| HeatmapError::InvalidDate(format!("Invalid year in '{month_str}'")))?;
    let month = month
        .parse::<u32>()
        .map_err(|_| HeatmapError::InvalidDate(format!("Invalid month in '{month_str}'")))?;

    if !(1..=12).contains(&month) {
        return Err(HeatmapError::InvalidDate(format!(
            "Month must be between 1-12, got {month}"
        )));
    }
    Ok((year, month))
}

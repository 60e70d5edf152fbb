//! Error types for chatheat
//!
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Most failures below the aggregation boundary never reach these types:
//! a missing log file or an unreadable timestamp is absorbed where it
//! happens. What remains here is what the caller must see.
//!
//! # Example
//!
//! ```
//! use chatheat_core::error::{HeatmapError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to HeatmapError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Main error type for chatheat operations
#[derive(Error, Debug)]
pub enum HeatmapError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// No SillyTavern data directory found
    #[error("No SillyTavern data directory found (set --data-dir or SILLYTAVERN_DATA_PATH)")]
    NoDataDirectory,

    /// The requested character is not known to the store
    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid timezone
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Intensity threshold table rejected
    #[error("Invalid intensity thresholds: {0}")]
    InvalidThresholds(String),

    /// The dated messages span more months than the calendar will generate
    #[error("Message dates span {months} months, more than the supported 1200")]
    MonthRangeTooLarge {
        /// Number of months the range would have produced
        months: u32,
    },

    /// The backing store answered with something unusable
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results in chatheat
pub type Result<T> = std::result::Result<T, HeatmapError>;

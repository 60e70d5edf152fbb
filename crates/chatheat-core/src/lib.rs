//! Core types, traits, and utilities for chatheat
//!
//! This crate provides the domain types, error handling, timezone
//! configuration, timestamp normalization, storage path guessing, and the
//! concurrency helpers used by all other chatheat crates.

pub mod calendar_types;
pub mod error;
pub mod path_candidates;
pub mod payload;
pub mod pool;
pub mod provider;
pub mod timestamp;
pub mod timezone;
pub mod types;

// Re-export commonly used types
pub use calendar_types::{AggregateStats, DayCell, IntensityThresholds, MonthView, RangeEnd, WeekStart};
pub use error::{HeatmapError, Result};
pub use provider::HistoryStore;
pub use types::{CharacterId, CharacterInfo, LogFileInfo, RawMessage, RawTimestamp, StoragePath};

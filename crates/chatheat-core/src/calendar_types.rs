//! Calendar data types for chatheat
//!
//! Pure data structures produced by the aggregator and consumed by the
//! formatters, plus the small configuration enums that shape them.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HeatmapError;

/// Highest intensity level a day can reach
pub const MAX_INTENSITY: u8 = 4;

/// Per-day message and character counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBucket {
    pub message_count: u64,
    pub char_count: u64,
}

impl DayBucket {
    pub fn add(&mut self, chars: u64) {
        self.message_count += 1;
        self.char_count += chars;
    }
}

/// One day of a month grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCell {
    /// Day of month, starting at 1
    pub day_number: u32,
    /// `YYYY-MM-DD`
    pub date_key: String,
    pub message_count: u64,
    pub char_count: u64,
    /// 0 for an empty day, up to [`MAX_INTENSITY`]
    pub intensity_level: u8,
}

impl DayCell {
    /// Calendar date of this cell
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date_key, "%Y-%m-%d").ok()
    }
}

/// One month of the heatmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthView {
    pub year: i32,
    /// 1-based month
    pub month: u32,
    /// Empty cells before day 1 in a 7-column grid
    pub leading_blank_count: u32,
    pub days: Vec<DayCell>,
    pub total_message_count: u64,
    pub total_char_count: u64,
}

impl MonthView {
    /// `YYYY-MM`
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Number of days in this month with at least one message
    pub fn active_days(&self) -> usize {
        self.days.iter().filter(|d| d.message_count > 0).count()
    }
}

/// Whole-run statistics and the month calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Earliest dated message
    pub first_contact_date: DateTime<Utc>,
    /// Whole days between the first message and the aggregation moment
    pub days_since_first_contact: i64,
    pub active_day_count: usize,
    pub total_messages: usize,
    pub total_chars: u64,
    pub total_rerolls: u64,
    /// Most recent month first
    pub calendar_months: Vec<MonthView>,
}

/// Ascending message-count cut points for intensity levels 1 through 4
///
/// A day's level is the number of cut points its message count reaches,
/// so the first cut point must be at least 1 to keep empty days at 0.
///
/// # Examples
/// ```
/// use chatheat_core::calendar_types::IntensityThresholds;
///
/// let table: IntensityThresholds = "1,20,50,100".parse().unwrap();
/// assert_eq!(table.level_for(0), 0);
/// assert_eq!(table.level_for(19), 1);
/// assert_eq!(table.level_for(20), 2);
/// assert_eq!(table.level_for(5000), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityThresholds([u64; 4]);

impl IntensityThresholds {
    /// {1, 50, 150, 300}
    pub const CLASSIC: Self = Self([1, 50, 150, 300]);
    /// {1, 20, 50, 100}
    pub const COMPACT: Self = Self([1, 20, 50, 100]);
    /// {1, 10, 30, 60}
    pub const GENTLE: Self = Self([1, 10, 30, 60]);

    /// Validate and build a table
    pub fn new(cut_points: [u64; 4]) -> Result<Self, HeatmapError> {
        if cut_points[0] == 0 {
            return Err(HeatmapError::InvalidThresholds(
                "the first cut point must be at least 1".to_string(),
            ));
        }
        if cut_points.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(HeatmapError::InvalidThresholds(format!(
                "cut points must be strictly ascending, got {cut_points:?}"
            )));
        }
        Ok(Self(cut_points))
    }

    /// The configured cut points
    pub fn cut_points(&self) -> [u64; 4] {
        self.0
    }

    /// Intensity level for a day with `message_count` messages
    pub fn level_for(&self, message_count: u64) -> u8 {
        self.0.iter().filter(|&&cut| message_count >= cut).count() as u8
    }
}

impl Default for IntensityThresholds {
    fn default() -> Self {
        Self::CLASSIC
    }
}

impl FromStr for IntensityThresholds {
    type Err = HeatmapError;

    /// Accepts a preset name (`classic`, `compact`, `gentle`) or four
    /// comma-separated counts
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => return Ok(Self::CLASSIC),
            "compact" => return Ok(Self::COMPACT),
            "gentle" => return Ok(Self::GENTLE),
            _ => {}
        }

        let values = s
            .split(',')
            .map(|part| part.trim().parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| HeatmapError::InvalidThresholds(format!("'{s}': {e}")))?;
        let cut_points: [u64; 4] = values.try_into().map_err(|values: Vec<u64>| {
            HeatmapError::InvalidThresholds(format!(
                "expected 4 cut points, got {}",
                values.len()
            ))
        })?;
        Self::new(cut_points)
    }
}

impl fmt::Display for IntensityThresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a},{b},{c},{d}")
    }
}

/// Where the month calendar stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeEnd {
    /// The month of the latest dated message
    #[default]
    LastMessage,
    /// The month of the aggregation moment
    Now,
}

impl fmt::Display for RangeEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastMessage => write!(f, "last-message"),
            Self::Now => write!(f, "now"),
        }
    }
}

impl FromStr for RangeEnd {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last-message" | "last" => Ok(Self::LastMessage),
            "now" => Ok(Self::Now),
            _ => Err(format!(
                "Invalid range end: {s}. Valid options are: last-message, now"
            )),
        }
    }
}

/// First column of the 7-column month grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    /// Column index of `weekday` in a grid starting on this day
    pub fn column_of(&self, weekday: Weekday) -> u32 {
        match self {
            WeekStart::Sunday => weekday.num_days_from_sunday(),
            WeekStart::Monday => weekday.num_days_from_monday(),
        }
    }

    /// Blank cells before the first day of `year`-`month`
    pub fn leading_blanks(&self, year: i32, month: u32) -> u32 {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| self.column_of(first.weekday()))
            .unwrap_or(0)
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sunday => write!(f, "sunday"),
            Self::Monday => write!(f, "monday"),
        }
    }
}

impl FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            _ => Err(format!(
                "Invalid week start: {s}. Valid options are: sunday, monday"
            )),
        }
    }
}

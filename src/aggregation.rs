//! Aggregation of chat messages into calendar statistics
//!
//! The aggregator takes raw message records, resolves their send dates,
//! buckets them by local calendar day, and lays the days out as a run of
//! month grids with per-day intensity levels.
//!
//! # Examples
//!
//! ```
//! use chatheat::aggregation::{AggregationOptions, Aggregator};
//! use chatheat::timezone::TimezoneConfig;
//! use chatheat::types::{RawMessage, RawTimestamp};
//! use chrono::{TimeZone, Utc};
//!
//! let aggregator = Aggregator::new(AggregationOptions {
//!     timezone: TimezoneConfig::utc(),
//!     ..AggregationOptions::default()
//! });
//! let messages = vec![RawMessage::new(
//!     Some(RawTimestamp::Text("2024-01-05@23h30m15s".to_string())),
//!     "Hello!",
//! )];
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
//! let stats = aggregator.aggregate(&messages, now).unwrap().unwrap();
//! assert_eq!(stats.total_messages, 1);
//! assert_eq!(stats.days_since_first_contact, 4);
//! ```

use crate::calendar_types::{
    AggregateStats, DayBucket, DayCell, IntensityThresholds, MonthView, RangeEnd, WeekStart,
};
use crate::error::{HeatmapError, Result};
use crate::timestamp::normalize;
use crate::timezone::TimezoneConfig;
use crate::types::{NormalizedMessage, RawMessage};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Upper bound on the number of month grids one call may produce
pub const MAX_CALENDAR_MONTHS: u32 = 1200;

/// Presentation choices that shape the calendar
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationOptions {
    /// Zone for parsing naive send dates and for day boundaries
    pub timezone: TimezoneConfig,
    pub thresholds: IntensityThresholds,
    pub range_end: RangeEnd,
    pub week_start: WeekStart,
}

/// Stateless aggregator; every call starts from scratch
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    options: AggregationOptions,
}

impl Aggregator {
    pub fn new(options: AggregationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// Messages with a resolvable send date, oldest first
    ///
    /// Messages sharing an instant keep their input order.
    pub fn normalize_messages(&self, messages: &[RawMessage]) -> Vec<NormalizedMessage> {
        let mut normalized: Vec<NormalizedMessage> = messages
            .iter()
            .filter_map(|message| {
                let timestamp = normalize(message.send_date.as_ref()?, &self.options.timezone)?;
                Some(NormalizedMessage {
                    timestamp,
                    text: message.text.clone(),
                    variant_count: message.variant_count,
                })
            })
            .collect();

        let dropped = messages.len() - normalized.len();
        if dropped > 0 {
            debug!("Dropped {} messages without a usable send date", dropped);
        }

        normalized.sort_by_key(|message| message.timestamp);
        normalized
    }

    /// Summarize `messages` as of `now`
    ///
    /// Returns `Ok(None)` when no message has a usable send date.
    ///
    /// # Errors
    ///
    /// [`HeatmapError::MonthRangeTooLarge`] when the calendar would need more
    /// than [`MAX_CALENDAR_MONTHS`] months.
    pub fn aggregate(
        &self,
        messages: &[RawMessage],
        now: DateTime<Utc>,
    ) -> Result<Option<AggregateStats>> {
        let normalized = self.normalize_messages(messages);
        let (Some(first), Some(last)) = (normalized.first(), normalized.last()) else {
            return Ok(None);
        };
        let first_instant = first.timestamp;
        let tz = &self.options.timezone;

        let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
        let mut total_chars = 0u64;
        let mut total_rerolls = 0u64;
        for message in &normalized {
            let chars = message.text.chars().count() as u64;
            total_chars += chars;
            total_rerolls += u64::from(message.variant_count.saturating_sub(1));
            buckets
                .entry(tz.local_date(&message.timestamp))
                .or_default()
                .add(chars);
        }

        let start = tz.local_date(&first_instant);
        let last_date = tz.local_date(&last.timestamp);
        let end = match self.options.range_end {
            RangeEnd::LastMessage => last_date,
            RangeEnd::Now => last_date.max(tz.local_date(&now)),
        };

        let mut calendar_months = self.build_months(start, end, &buckets)?;
        calendar_months.reverse();

        Ok(Some(AggregateStats {
            first_contact_date: first_instant,
            days_since_first_contact: (now - first_instant).num_days().max(0),
            active_day_count: buckets.len(),
            total_messages: normalized.len(),
            total_chars,
            total_rerolls,
            calendar_months,
        }))
    }

    /// Contiguous month grids from `start`'s month to `end`'s month, oldest first
    fn build_months(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        buckets: &BTreeMap<NaiveDate, DayBucket>,
    ) -> Result<Vec<MonthView>> {
        let months = month_index(end) - month_index(start) + 1;
        if months > i64::from(MAX_CALENDAR_MONTHS) {
            return Err(HeatmapError::MonthRangeTooLarge {
                months: u32::try_from(months).unwrap_or(u32::MAX),
            });
        }

        let (mut year, mut month) = (start.year(), start.month());
        let mut views = Vec::with_capacity(months.max(0) as usize);
        for _ in 0..months {
            views.push(self.build_month(year, month, buckets));
            (year, month) = if month == 12 {
                (year + 1, 1)
            } else {
                (year, month + 1)
            };
        }
        Ok(views)
    }

    fn build_month(
        &self,
        year: i32,
        month: u32,
        buckets: &BTreeMap<NaiveDate, DayBucket>,
    ) -> MonthView {
        let days: Vec<DayCell> = (1..=days_in_month(year, month))
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .map(|date| {
                let bucket = buckets.get(&date).copied().unwrap_or_default();
                DayCell {
                    day_number: date.day(),
                    date_key: date.format("%Y-%m-%d").to_string(),
                    message_count: bucket.message_count,
                    char_count: bucket.char_count,
                    intensity_level: self.options.thresholds.level_for(bucket.message_count),
                }
            })
            .collect();

        MonthView {
            year,
            month,
            leading_blank_count: self.options.week_start.leading_blanks(year, month),
            total_message_count: days.iter().map(|d| d.message_count).sum(),
            total_char_count: days.iter().map(|d| d.char_count).sum(),
            days,
        }
    }
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|n| n.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

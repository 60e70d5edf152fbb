//! Month selection over an aggregated calendar
//!
//! The calendar is ordered most recent first, so index 0 is the newest
//! month and "older" moves toward the end of the list.

use crate::calendar_types::{AggregateStats, MonthView};

/// Which month of the calendar is on display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarCursor {
    index: usize,
}

impl CalendarCursor {
    /// Cursor on the most recent month
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor `offset` months back from the most recent, clamped to the
    /// oldest month
    pub fn at_offset(stats: &AggregateStats, offset: usize) -> Self {
        Self {
            index: offset.min(stats.calendar_months.len().saturating_sub(1)),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The selected month, if the calendar has any
    pub fn current<'a>(&self, stats: &'a AggregateStats) -> Option<&'a MonthView> {
        stats.calendar_months.get(self.index)
    }

    pub fn has_older(&self, stats: &AggregateStats) -> bool {
        self.index + 1 < stats.calendar_months.len()
    }

    pub fn has_newer(&self) -> bool {
        self.index > 0
    }

    /// One month back, staying put at the oldest month
    pub fn older(self, stats: &AggregateStats) -> Self {
        if self.has_older(stats) {
            Self {
                index: self.index + 1,
            }
        } else {
            self
        }
    }

    /// One month forward, staying put at the newest month
    pub fn newer(self) -> Self {
        Self {
            index: self.index.saturating_sub(1),
        }
    }

    /// Jump to `year`-`month`; `None` when that month is outside the calendar
    pub fn seek(stats: &AggregateStats, year: i32, month: u32) -> Option<Self> {
        stats
            .calendar_months
            .iter()
            .position(|m| m.year == year && m.month == month)
            .map(|index| Self { index })
    }
}

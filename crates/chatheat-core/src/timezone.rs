//! Timezone handling for calendar bucketing
//!
//! Chat logs mostly carry wall-clock times without an offset, and day
//! buckets are local calendar days. Both directions go through the
//! configured zone: naive times are resolved into instants, and instants
//! are projected back onto local dates.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

use crate::error::{HeatmapError, Result};

/// Configuration for timezone handling
#[derive(Debug, Clone, Copy)]
pub struct TimezoneConfig {
    /// The zone that "local" means for parsing and bucketing
    pub tz: Tz,
    /// Whether the zone is UTC
    pub is_utc: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self::new(get_local_timezone())
    }
}

impl TimezoneConfig {
    /// Wrap an explicit zone
    pub fn new(tz: Tz) -> Self {
        Self {
            is_utc: tz == Tz::UTC,
            tz,
        }
    }

    /// UTC, mostly useful for deterministic tests
    pub fn utc() -> Self {
        Self::new(Tz::UTC)
    }

    /// Create a configuration from CLI arguments
    pub fn from_cli(timezone_str: Option<&str>, use_utc: bool) -> Result<Self> {
        if use_utc {
            return Ok(Self::utc());
        }

        match timezone_str {
            Some(tz_str) => {
                let tz = Tz::from_str(tz_str).map_err(|_| {
                    HeatmapError::InvalidTimezone(format!(
                        "'{tz_str}'. Use format like 'America/New_York', 'Asia/Shanghai', or 'UTC'"
                    ))
                })?;
                Ok(Self::new(tz))
            }
            None => Ok(Self::default()),
        }
    }

    /// Get the display name for the configured timezone
    pub fn display_name(&self) -> &str {
        if self.is_utc { "UTC" } else { self.tz.name() }
    }

    /// Resolve a wall-clock time in this zone to an instant
    ///
    /// Ambiguous times (DST fall-back) take the earlier instant; times that
    /// do not exist (DST spring-forward gap) resolve to `None`.
    pub fn resolve_local(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => None,
        }
    }

    /// Calendar date of an instant in this zone
    pub fn local_date(&self, instant: &DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }
}

/// Detect the system's local timezone
///
/// Checks `TZ` first, then asks the OS; falls back to UTC.
pub fn get_local_timezone() -> Tz {
    if let Ok(tz_str) = std::env::var("TZ")
        && let Ok(tz) = Tz::from_str(&tz_str)
    {
        debug!("Using timezone from TZ environment variable: {}", tz_str);
        return tz;
    }

    match iana_time_zone::get_timezone() {
        Ok(tz_str) => match Tz::from_str(&tz_str) {
            Ok(tz) => {
                debug!("Using system timezone from iana-time-zone: {}", tz_str);
                tz
            }
            Err(_) => {
                debug!(
                    "Could not parse timezone from iana-time-zone: '{}', falling back to UTC",
                    tz_str
                );
                Tz::UTC
            }
        },
        Err(e) => {
            debug!(
                "Could not detect local timezone via iana-time-zone: {:?}, falling back to UTC",
                e
            );
            Tz::UTC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_timezone_config_utc() {
        let config = TimezoneConfig::from_cli(None, true).unwrap();
        assert!(config.is_utc);
        assert_eq!(config.display_name(), "UTC");
    }

    #[test]
    fn test_timezone_config_explicit() {
        let config = TimezoneConfig::from_cli(Some("Asia/Shanghai"), false).unwrap();
        assert!(!config.is_utc);
        assert_eq!(config.display_name(), "Asia/Shanghai");
    }

    #[test]
    fn test_timezone_config_invalid() {
        let result = TimezoneConfig::from_cli(Some("Invalid/Timezone"), false);
        assert!(matches!(result, Err(HeatmapError::InvalidTimezone(_))));
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let config = TimezoneConfig::new(chrono_tz::Asia::Shanghai);
        let instant = Utc.with_ymd_and_hms(2024, 1, 31, 17, 0, 0).unwrap();
        assert_eq!(
            config.local_date(&instant),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_resolve_local_gap_and_overlap() {
        let config = TimezoneConfig::new(chrono_tz::America::New_York);

        // 2024-03-10 02:30 does not exist in New York
        let gap = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        assert!(config.resolve_local(gap).is_none());

        // 2024-11-03 01:30 happens twice; the EDT reading comes first
        let overlap = NaiveDate::from_ymd_opt(2024, 11, 3)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        let resolved = config.resolve_local(overlap).unwrap();
        assert_eq!(resolved.hour(), 5);
    }
}

//! Timestamp normalization
//!
//! Chat logs written by different versions of the host application encode
//! send dates differently: epoch milliseconds, `"January 5, 2024 11:30pm"`,
//! `"2024-01-05@23h30m15s"`, ISO strings, and assorted locale renderings.
//! [`normalize`] tries a fixed sequence of strategies and returns the first
//! instant any of them produces. No strategy panics; a failure simply
//! hands over to the next one.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::timezone::TimezoneConfig;
use crate::types::RawTimestamp;

/// Month names and abbreviations, lowercase
const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

/// Layouts carrying their own offset
const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%a %b %d %Y %H:%M:%S GMT%z",
];

/// Wall-clock layouts, interpreted in the configured zone
const NAIVE_DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y, %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%a %b %d %Y %H:%M:%S",
];

/// Date-only layouts, taken as local midnight
const NAIVE_DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Normalize a raw send date into an instant
///
/// Returns `None` when no strategy yields a valid instant.
///
/// # Examples
/// ```
/// use chatheat_core::timestamp::normalize;
/// use chatheat_core::timezone::TimezoneConfig;
/// use chatheat_core::types::RawTimestamp;
///
/// let tz = TimezoneConfig::utc();
/// let instant = normalize(&RawTimestamp::Text("January 5, 2024 11:30pm".into()), &tz).unwrap();
/// assert_eq!(instant.to_rfc3339(), "2024-01-05T23:30:00+00:00");
///
/// assert!(normalize(&RawTimestamp::Text("not a date".into()), &tz).is_none());
/// ```
pub fn normalize(raw: &RawTimestamp, tz: &TimezoneConfig) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Millis(ms) => from_epoch_millis(*ms),
        RawTimestamp::Text(text) => normalize_text(text.trim(), tz),
    }
}

/// Normalize a textual send date
pub fn normalize_text(text: &str, tz: &TimezoneConfig) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }

    parse_month_name_clock(text, tz)
        .or_else(|| parse_at_clock(text, tz))
        .or_else(|| parse_glued_meridiem(text, tz))
        .or_else(|| parse_generic(text, tz))
}

fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    let ms = ms.trunc();
    if ms < i64::MIN as f64 || ms > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    MONTHS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, number)| *number)
}

/// `"<Month> <Day>, <Year> <H>:<MM><am|pm>"`, with or without a space
/// before the meridiem
fn parse_month_name_clock(text: &str, tz: &TimezoneConfig) -> Option<DateTime<Utc>> {
    let mut parts = text.split_whitespace();
    let month = month_number(parts.next()?)?;
    let day: u32 = parts.next()?.strip_suffix(',')?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    let clock: String = parts.collect();
    let (hour, minute) = parse_meridiem_clock(&clock)?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    tz.resolve_local(naive)
}

/// `"11:30pm"` -> `(23, 30)`, `"12:15am"` -> `(0, 15)`
fn parse_meridiem_clock(clock: &str) -> Option<(u32, u32)> {
    let clock = clock.to_ascii_lowercase();
    let (digits, is_pm) = if let Some(rest) = clock.strip_suffix("pm") {
        (rest, true)
    } else {
        (clock.strip_suffix("am")?, false)
    };

    let (hour, minute) = digits.split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour > 12 || minute > 59 {
        return None;
    }

    let hour = match (is_pm, hour) {
        (true, 12) => 12,
        (true, h) => h + 12,
        (false, 12) => 0,
        (false, h) => h,
    };
    Some((hour, minute))
}

/// `"2024-01-05@23h30m15s"`, also `"2024-1-5 @23h 30m 15s 120ms"`
fn parse_at_clock(text: &str, tz: &TimezoneConfig) -> Option<DateTime<Utc>> {
    let (date, clock) = text.split_once('@')?;
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;

    let mut hour = None;
    let mut minute = None;
    let mut second = 0;
    let mut millis = 0;

    let compact: String = clock.chars().filter(|c| !c.is_whitespace()).collect();
    let mut rest = compact.as_str();
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
        if digits_end == 0 {
            return None;
        }
        let value: u32 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];

        if let Some(tail) = rest.strip_prefix("ms") {
            millis = value;
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('h') {
            hour = Some(value);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('m') {
            minute = Some(value);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('s') {
            second = value;
            rest = tail;
        } else {
            return None;
        }
    }

    let time = NaiveTime::from_hms_milli_opt(hour?, minute?, second, millis)?;
    tz.resolve_local(date.and_time(time))
}

/// `"1/5/2024, 11:30:00PM"` -> `"1/5/2024, 11:30:00 PM"` and retry
fn parse_glued_meridiem(text: &str, tz: &TimezoneConfig) -> Option<DateTime<Utc>> {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let glued = (1..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i - 1].is_ascii_digit() && (bytes[i] == b'a' || bytes[i] == b'p') && bytes[i + 1] == b'm'
    })?;

    let fixed = format!("{} {}", &text[..glued], &text[glued..]);
    parse_generic(&fixed, tz)
}

/// Free-form fallback over well-known layouts
fn parse_generic(text: &str, tz: &TimezoneConfig) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(text, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for layout in NAIVE_DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return tz.resolve_local(naive);
        }
    }

    for layout in NAIVE_DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return tz.resolve_local(date.and_time(NaiveTime::MIN));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    fn text(s: &str) -> RawTimestamp {
        RawTimestamp::Text(s.to_string())
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_month_name_pm() {
        let tz = TimezoneConfig::utc();
        assert_eq!(
            normalize(&text("January 5, 2024 11:30pm"), &tz),
            Some(utc(2024, 1, 5, 23, 30, 0))
        );
    }

    #[test]
    fn test_month_name_midnight_am() {
        let tz = TimezoneConfig::utc();
        assert_eq!(
            normalize(&text("January 5, 2024 12:15am"), &tz),
            Some(utc(2024, 1, 5, 0, 15, 0))
        );
    }

    #[test]
    fn test_month_name_noon_and_abbreviations() {
        let tz = TimezoneConfig::utc();
        assert_eq!(
            normalize(&text("Sept 9, 2023 12:05pm"), &tz),
            Some(utc(2023, 9, 9, 12, 5, 0))
        );
        assert_eq!(
            normalize(&text("Feb 29, 2024 7:45 AM"), &tz),
            Some(utc(2024, 2, 29, 7, 45, 0))
        );
    }

    #[test]
    fn test_month_name_interpreted_locally() {
        let tz = TimezoneConfig::new(Tz::Asia__Shanghai);
        assert_eq!(
            normalize(&text("January 5, 2024 11:30pm"), &tz),
            Some(utc(2024, 1, 5, 15, 30, 0))
        );
    }

    #[test]
    fn test_epoch_millis() {
        let tz = TimezoneConfig::utc();
        let instant = normalize(&RawTimestamp::Millis(1_700_000_000_000.0), &tz).unwrap();
        assert_eq!(instant.timestamp_millis(), 1_700_000_000_000);

        assert!(normalize(&RawTimestamp::Millis(f64::NAN), &tz).is_none());
        assert!(normalize(&RawTimestamp::Millis(f64::INFINITY), &tz).is_none());
        assert!(normalize(&RawTimestamp::Millis(1e300), &tz).is_none());
    }

    #[test]
    fn test_at_separated_clock() {
        let tz = TimezoneConfig::utc();
        assert_eq!(
            normalize(&text("2024-01-05@23h30m15s"), &tz),
            Some(utc(2024, 1, 5, 23, 30, 15))
        );
        assert_eq!(
            normalize(&text("2024-1-5 @9h 05m 07s 250ms"), &tz)
                .map(|dt| dt.timestamp_millis()),
            Some(utc(2024, 1, 5, 9, 5, 7).timestamp_millis() + 250)
        );
        assert!(normalize(&text("2024-01-05@23h"), &tz).is_none());
        assert!(normalize(&text("2024-01-05@xxh"), &tz).is_none());
    }

    #[test]
    fn test_glued_meridiem() {
        let tz = TimezoneConfig::utc();
        assert_eq!(
            normalize(&text("1/5/2024, 11:30:00PM"), &tz),
            Some(utc(2024, 1, 5, 23, 30, 0))
        );
        assert_eq!(
            normalize(&text("1/5/2024 9:15am"), &tz),
            Some(utc(2024, 1, 5, 9, 15, 0))
        );
    }

    #[test]
    fn test_generic_layouts() {
        let tz = TimezoneConfig::utc();
        assert_eq!(
            normalize(&text("2024-01-05T23:30:00.000Z"), &tz),
            Some(utc(2024, 1, 5, 23, 30, 0))
        );
        assert_eq!(
            normalize(&text("2024-01-05T23:30:00+08:00"), &tz),
            Some(utc(2024, 1, 5, 15, 30, 0))
        );
        assert_eq!(
            normalize(&text("2024-01-05 08:00:00"), &tz),
            Some(utc(2024, 1, 5, 8, 0, 0))
        );
        assert_eq!(
            normalize(&text("2024-01-05"), &tz),
            Some(utc(2024, 1, 5, 0, 0, 0))
        );
        assert_eq!(
            normalize(&text("Fri, 05 Jan 2024 23:30:00 +0000"), &tz),
            Some(utc(2024, 1, 5, 23, 30, 0))
        );
    }

    #[test]
    fn test_unparseable() {
        let tz = TimezoneConfig::utc();
        assert!(normalize(&text("not a date"), &tz).is_none());
        assert!(normalize(&text(""), &tz).is_none());
        assert!(normalize(&text("   "), &tz).is_none());
        assert!(normalize(&text("February 30, 2024 10:00am"), &tz).is_none());
        assert!(normalize(&text("January 5, 2024 13:00pm"), &tz).is_none());
    }

    #[test]
    fn test_dst_gap_is_unparseable() {
        let tz = TimezoneConfig::new(Tz::America__New_York);
        assert!(normalize(&text("March 10, 2024 2:30am"), &tz).is_none());
    }
}

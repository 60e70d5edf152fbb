//! Output formatting for chatheat
//!
//! Two formatters share one trait:
//! - [`TableFormatter`] prints a summary table and a 7-column month grid
//!   shaded by intensity level
//! - [`JsonFormatter`] emits the same data for scripts
//!
//! # Examples
//!
//! ```no_run
//! use chatheat_terminal::get_formatter;
//! use chatheat_core::calendar_types::WeekStart;
//! # fn stats() -> chatheat_core::AggregateStats { unimplemented!() }
//!
//! let stats = stats();
//! let formatter = get_formatter(false, true);
//! let month = stats.calendar_months.first();
//! println!("{}", formatter.format_stats("Seraphina", &stats, month, WeekStart::Sunday));
//! ```

use chatheat_core::calendar_types::{AggregateStats, MonthView, WeekStart};
use chatheat_core::types::CharacterInfo;
use chrono::Weekday;
use colored::Colorize;
use prettytable::{Table, format, row};
use serde_json::json;

/// Shades for intensity levels 1 through 4
const LEVEL_SHADES: [(u8, u8, u8); 4] = [
    (155, 233, 168),
    (64, 196, 99),
    (48, 161, 78),
    (33, 110, 57),
];

/// Markers for intensity levels 0 through 4 when color is off
const LEVEL_MARKS: [char; 5] = [' ', '.', ':', '*', '#'];

/// Formats aggregate results for display
pub trait OutputFormatter {
    /// Summary for one run plus the grid of `month`
    fn format_stats(
        &self,
        title: &str,
        stats: &AggregateStats,
        month: Option<&MonthView>,
        week_start: WeekStart,
    ) -> String;

    /// Known characters with their ids
    fn format_characters(&self, characters: &[CharacterInfo]) -> String;
}

/// Human-readable tables and grids
pub struct TableFormatter {
    /// Shade cells with terminal colors instead of markers
    pub colored: bool,
}

impl TableFormatter {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Thousands separators, `1234567` -> `1,234,567`
    fn format_number(n: u64) -> String {
        let digits = n.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out
    }

    fn summary_table(stats: &AggregateStats) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_CLEAN);
        table.add_row(row![
            b -> "First contact",
            stats.first_contact_date.format("%Y-%m-%d").to_string()
        ]);
        table.add_row(row![b -> "Days since", r -> Self::format_number(stats.days_since_first_contact.max(0) as u64)]);
        table.add_row(row![b -> "Active days", r -> Self::format_number(stats.active_day_count as u64)]);
        table.add_row(row![b -> "Messages", r -> Self::format_number(stats.total_messages as u64)]);
        table.add_row(row![b -> "Characters", r -> Self::format_number(stats.total_chars)]);
        table.add_row(row![b -> "Rerolls", r -> Self::format_number(stats.total_rerolls)]);
        table
    }

    fn weekday_header(week_start: WeekStart) -> String {
        let first = match week_start {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        };
        std::iter::successors(Some(first), |day| Some(day.succ()))
            .take(7)
            .map(|day| format!("{:>3} ", &day.to_string()[..2]))
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn cell(&self, day_number: u32, level: u8) -> String {
        let level = usize::from(level).min(LEVEL_MARKS.len() - 1);
        if !self.colored {
            return format!("{:>2}{} ", day_number, LEVEL_MARKS[level]);
        }
        let text = format!("{day_number:>3}");
        match level {
            0 => format!("{} ", text.dimmed()),
            _ => {
                let (r, g, b) = LEVEL_SHADES[level - 1];
                format!("{} ", text.black().on_truecolor(r, g, b))
            }
        }
    }

    fn month_grid(&self, month: &MonthView, week_start: WeekStart) -> String {
        let mut out = format!(
            "{}  {} messages, {} characters, {} active days\n",
            month.label(),
            Self::format_number(month.total_message_count),
            Self::format_number(month.total_char_count),
            month.active_days()
        );
        out.push_str(&Self::weekday_header(week_start));
        out.push('\n');

        let mut line = "    ".repeat(month.leading_blank_count as usize);
        let mut column = month.leading_blank_count;
        for day in &month.days {
            line.push_str(&self.cell(day.day_number, day.intensity_level));
            column += 1;
            if column == 7 {
                out.push_str(line.trim_end());
                out.push('\n');
                line.clear();
                column = 0;
            }
        }
        if !line.is_empty() {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    fn month_index(months: &[MonthView]) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![b -> "Month", b -> "Messages", b -> "Characters", b -> "Active days"]);
        for month in months.iter().filter(|m| m.total_message_count > 0) {
            table.add_row(row![
                month.label(),
                r -> Self::format_number(month.total_message_count),
                r -> Self::format_number(month.total_char_count),
                r -> month.active_days()
            ]);
        }
        table
    }
}

impl OutputFormatter for TableFormatter {
    fn format_stats(
        &self,
        title: &str,
        stats: &AggregateStats,
        month: Option<&MonthView>,
        week_start: WeekStart,
    ) -> String {
        let mut output = if self.colored {
            format!("{}\n\n", title.bold())
        } else {
            format!("{title}\n\n")
        };
        output.push_str(&Self::summary_table(stats).to_string());
        output.push('\n');

        if let Some(month) = month {
            output.push_str(&self.month_grid(month, week_start));
            output.push('\n');
        }

        output.push_str(&Self::month_index(&stats.calendar_months).to_string());
        output
    }

    fn format_characters(&self, characters: &[CharacterInfo]) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![b -> "Id", b -> "Name", b -> "Avatar"]);
        for character in characters {
            table.add_row(row![
                r -> character.id,
                character.display_name,
                character.avatar.as_deref().unwrap_or("-")
            ]);
        }
        table.to_string()
    }
}

/// Machine-readable output
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_stats(
        &self,
        title: &str,
        stats: &AggregateStats,
        month: Option<&MonthView>,
        week_start: WeekStart,
    ) -> String {
        let output = json!({
            "title": title,
            "week_start": week_start.to_string(),
            "first_contact_date": stats.first_contact_date.to_rfc3339(),
            "days_since_first_contact": stats.days_since_first_contact,
            "active_day_count": stats.active_day_count,
            "total_messages": stats.total_messages,
            "total_chars": stats.total_chars,
            "total_rerolls": stats.total_rerolls,
            "selected_month": month.map(|m| m.label()),
            "calendar_months": stats.calendar_months,
        });
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_characters(&self, characters: &[CharacterInfo]) -> String {
        serde_json::to_string_pretty(characters).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Pick a formatter for the requested output mode
pub fn get_formatter(json_output: bool, colored: bool) -> Box<dyn OutputFormatter> {
    if json_output {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter::new(colored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatheat_core::calendar_types::DayCell;
    use chatheat_core::types::CharacterId;
    use chrono::{TimeZone, Utc};

    fn month(year: i32, month: u32, days: u32, blanks: u32) -> MonthView {
        MonthView {
            year,
            month,
            leading_blank_count: blanks,
            days: (1..=days)
                .map(|d| DayCell {
                    day_number: d,
                    date_key: format!("{year:04}-{month:02}-{d:02}"),
                    message_count: if d == 2 { 60 } else { 0 },
                    char_count: if d == 2 { 1200 } else { 0 },
                    intensity_level: if d == 2 { 2 } else { 0 },
                })
                .collect(),
            total_message_count: 60,
            total_char_count: 1200,
        }
    }

    fn stats() -> AggregateStats {
        AggregateStats {
            first_contact_date: Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap(),
            days_since_first_contact: 40,
            active_day_count: 1,
            total_messages: 60,
            total_chars: 1200,
            total_rerolls: 3,
            calendar_months: vec![month(2024, 2, 29, 4)],
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(TableFormatter::format_number(0), "0");
        assert_eq!(TableFormatter::format_number(999), "999");
        assert_eq!(TableFormatter::format_number(1000), "1,000");
        assert_eq!(TableFormatter::format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_weekday_header() {
        assert!(TableFormatter::weekday_header(WeekStart::Sunday).starts_with(" Su"));
        assert!(TableFormatter::weekday_header(WeekStart::Monday).ends_with("Su"));
    }

    #[test]
    fn test_month_grid_layout() {
        let formatter = TableFormatter::new(false);
        let feb = month(2024, 2, 29, 4);
        let grid = formatter.month_grid(&feb, WeekStart::Sunday);
        let lines: Vec<&str> = grid.lines().collect();

        assert!(lines[0].starts_with("2024-02"));
        assert!(lines[0].contains("1,200 characters"));
        // 4 blanks then Thu 1, Fri 2, Sat 3
        assert_eq!(lines[2], format!("{} 1   2:  3", " ".repeat(16)));
        // 4 + 29 cells span five rows
        assert_eq!(lines.len(), 2 + 5);
        assert!(lines.last().unwrap().contains("29"));
    }

    #[test]
    fn test_table_output() {
        let formatter = TableFormatter::new(false);
        let stats = stats();
        let output =
            formatter.format_stats("Seraphina", &stats, stats.calendar_months.first(), WeekStart::Sunday);
        assert!(output.contains("Seraphina"));
        assert!(output.contains("2024-02-02"));
        assert!(output.contains("Rerolls"));
        assert!(output.contains("2024-02"));
    }

    #[test]
    fn test_json_output() {
        let formatter = JsonFormatter;
        let stats = stats();
        let output =
            formatter.format_stats("Global", &stats, stats.calendar_months.first(), WeekStart::Monday);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["total_messages"], 60);
        assert_eq!(parsed["week_start"], "monday");
        assert_eq!(parsed["selected_month"], "2024-02");
        assert_eq!(parsed["calendar_months"][0]["days"][1]["intensity_level"], 2);
    }

    #[test]
    fn test_format_characters() {
        let characters = vec![
            CharacterInfo {
                id: CharacterId::new("0"),
                display_name: "Seraphina".to_string(),
                avatar: Some("Seraphina.png".to_string()),
            },
            CharacterInfo {
                id: CharacterId::new("1"),
                display_name: "Nameless".to_string(),
                avatar: None,
            },
        ];
        let table = TableFormatter::new(false).format_characters(&characters);
        assert!(table.contains("Seraphina.png"));
        assert!(table.contains("Nameless"));

        let json = JsonFormatter.format_characters(&characters);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[1]["avatar"], serde_json::Value::Null);
    }
}

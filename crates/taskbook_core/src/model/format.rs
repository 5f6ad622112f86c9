//! Fixed textual formats for persisted dates and timestamps.
//!
//! # Invariants
//! - Date text is parsed strictly: it must re-format to exactly the input.
//! - Timestamps are offset-free local date-times.

use chrono::{NaiveDate, NaiveDateTime};
use std::error::Error;
use std::fmt::{Display, Formatter, Write};

/// Calendar date format: 4-digit year, 2-digit month, 2-digit day.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
/// ISO-8601 style local date-time with optional fractional seconds.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Rejected strftime pattern passed to [`TaskFormats::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFormatError {
    pub pattern: String,
}

impl Display for InvalidFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid date/time format pattern `{}`", self.pattern)
    }
}

impl Error for InvalidFormatError {}

/// Date and timestamp patterns shared by validation and persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFormats {
    date: String,
    timestamp: String,
}

impl Default for TaskFormats {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_FORMAT.to_string(),
            timestamp: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl TaskFormats {
    /// Builds formats from custom strftime patterns.
    ///
    /// Both patterns must render every component they are later parsed from:
    /// a sample date and a sample timestamp with sub-second precision have to
    /// come back unchanged after format-then-parse.
    ///
    /// # Errors
    /// - Returns an error when either pattern contains an unknown specifier.
    /// - Returns an error when a pattern drops information (no year, no
    ///   seconds, truncated fractions, ...).
    pub fn new(
        date: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Result<Self, InvalidFormatError> {
        let formats = Self {
            date: date.into(),
            timestamp: timestamp.into(),
        };
        if !formats.date_roundtrips() {
            return Err(InvalidFormatError {
                pattern: formats.date,
            });
        }
        if !formats.timestamp_roundtrips() {
            return Err(InvalidFormatError {
                pattern: formats.timestamp,
            });
        }
        Ok(formats)
    }

    pub fn date_pattern(&self) -> &str {
        &self.date
    }

    pub fn timestamp_pattern(&self) -> &str {
        &self.timestamp
    }

    /// Parses date text, rejecting inputs that only loosely match the pattern
    /// (e.g. `2025-7-1` under `%Y-%m-%d`).
    pub fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        let date = NaiveDate::parse_from_str(text, &self.date).ok()?;
        (self.format_date(date) == text).then_some(date)
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.date).to_string()
    }

    pub fn parse_timestamp(&self, text: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text.trim(), &self.timestamp).ok()
    }

    pub fn format_timestamp(&self, timestamp: NaiveDateTime) -> String {
        timestamp.format(&self.timestamp).to_string()
    }

    fn date_roundtrips(&self) -> bool {
        !self.date.is_empty()
            && sample_timestamps().iter().all(|sample| {
                let date = sample.date();
                renders(date.format(&self.date))
                    && self.parse_date(&self.format_date(date)) == Some(date)
            })
    }

    fn timestamp_roundtrips(&self) -> bool {
        !self.timestamp.is_empty()
            && sample_timestamps().iter().all(|&sample| {
                renders(sample.format(&self.timestamp))
                    && self.parse_timestamp(&self.format_timestamp(sample)) == Some(sample)
            })
    }
}

// Samples span two centuries and carry sub-second parts; a pattern that
// omits, truncates or abbreviates a component fails on at least one.
fn sample_timestamps() -> [NaiveDateTime; 2] {
    [
        sample_at(2031, 11, 23, 17, 48, 59, 123_456_789),
        sample_at(1931, 2, 4, 3, 5, 7, 1),
    ]
}

fn sample_at(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32, nano: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_nano_opt(h, m, s, nano))
        .unwrap_or_default()
}

// Unknown or inapplicable specifiers surface as a fmt error, which
// `to_string` would turn into a panic.
fn renders(value: impl Display) -> bool {
    let mut out = String::new();
    write!(out, "{value}").is_ok()
}

#[cfg(test)]
mod tests {
    use super::TaskFormats;
    use chrono::NaiveDate;

    #[test]
    fn parse_date_is_strict_about_padding() {
        let formats = TaskFormats::default();
        assert_eq!(
            formats.parse_date("2025-07-01"),
            NaiveDate::from_ymd_opt(2025, 7, 1)
        );
        assert_eq!(formats.parse_date("2025-7-1"), None);
        assert_eq!(formats.parse_date("2025-02-30"), None);
        assert_eq!(formats.parse_date("20/07/2025"), None);
    }

    #[test]
    fn timestamp_with_nanoseconds_survives_format_and_parse() {
        let formats = TaskFormats::default();
        let timestamp = NaiveDate::from_ymd_opt(2025, 7, 20)
            .unwrap()
            .and_hms_nano_opt(9, 30, 15, 123_456_789)
            .unwrap();

        let text = formats.format_timestamp(timestamp);
        assert_eq!(text, "2025-07-20T09:30:15.123456789");
        assert_eq!(formats.parse_timestamp(&text), Some(timestamp));
    }

    #[test]
    fn new_rejects_unknown_specifiers() {
        let err = TaskFormats::new("%Y-%Q", "%H:%M").unwrap_err();
        assert_eq!(err.pattern, "%Y-%Q");

        let err = TaskFormats::new("%Y %H", "%H:%M").unwrap_err();
        assert_eq!(err.pattern, "%Y %H");

        let custom = TaskFormats::new("%d.%m.%Y", "%d.%m.%Y %H:%M:%S%.f").unwrap();
        assert_eq!(
            custom.parse_date("20.07.2025"),
            NaiveDate::from_ymd_opt(2025, 7, 20)
        );
    }

    #[test]
    fn new_rejects_patterns_that_lose_information() {
        for timestamp in [
            "%H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M:%S%.3f",
        ] {
            let err = TaskFormats::new("%Y-%m-%d", timestamp).unwrap_err();
            assert_eq!(err.pattern, timestamp);
        }

        for date in ["%m-%d", "%Y-%m", "%y%m%d"] {
            let err = TaskFormats::new(date, "%Y-%m-%dT%H:%M:%S%.f").unwrap_err();
            assert_eq!(err.pattern, date);
        }

        assert_eq!(
            TaskFormats::new("%Y-%m-%d", "%Y-%m-%dT%H:%M:%S%.f").unwrap(),
            TaskFormats::default()
        );
    }
}

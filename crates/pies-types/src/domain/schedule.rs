//! Delivery timestamps, report ranges and the reminder lookahead band.
//!
//! All timestamps are naive local time: the operators and the bot share one
//! wall clock, and that is the clock delivery dates are typed in.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::domain::ValidationError;

pub const DELIVERY_FORMAT: &str = "%d.%m.%Y %H:%M";
pub const DELIVERY_EXAMPLE: &str = "18.02.2026 14:00";
pub const DAY_FORMAT: &str = "%d.%m.%Y";
pub const DAY_EXAMPLE: &str = "18.02.2026";

pub fn parse_delivery(input: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(input.trim(), DELIVERY_FORMAT).map_err(|_| {
        ValidationError::BadDate {
            input: input.trim().to_string(),
            expected: DELIVERY_EXAMPLE,
        }
    })
}

pub fn format_delivery(ts: &NaiveDateTime) -> String {
    ts.format(DELIVERY_FORMAT).to_string()
}

fn parse_day(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input, DAY_FORMAT).map_err(|_| ValidationError::BadDate {
        input: input.to_string(),
        expected: DAY_EXAMPLE,
    })
}

/// Closed interval of delivery timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// From the first second of `first` through 23:59:59 of `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Result<Self, ValidationError> {
        if last < first {
            return Err(ValidationError::InvertedRange {
                start: first,
                end: last,
            });
        }
        let start = first.and_hms_opt(0, 0, 0);
        let end = last.and_hms_opt(23, 59, 59);
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(ValidationError::BadDate {
                input: format!("{first} {last}"),
                expected: DAY_EXAMPLE,
            }),
        }
    }

    /// Report input: one day (`18.02.2026`) or two (`18.02.2026 20.02.2026`,
    /// a dash between them is also accepted).
    pub fn parse_report(input: &str) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = input
            .split(|c: char| c.is_whitespace() || c == '-')
            .filter(|p| !p.is_empty())
            .collect();
        match parts.as_slice() {
            [day] => {
                let d = parse_day(day)?;
                Self::days(d, d)
            }
            [first, last] => Self::days(parse_day(first)?, parse_day(last)?),
            _ => Err(ValidationError::BadDate {
                input: input.trim().to_string(),
                expected: DAY_EXAMPLE,
            }),
        }
    }
}

/// Offsets from "now" bounding which deliveries are due for a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookaheadWindow {
    pub start: Duration,
    pub end: Duration,
}

impl LookaheadWindow {
    pub fn hours(start: i64, end: i64) -> Self {
        Self {
            start: Duration::hours(start),
            end: Duration::hours(end),
        }
    }

    /// Bounds are whole seconds, the precision the SQLite store keeps.
    pub fn range_from(&self, now: NaiveDateTime) -> DateRange {
        let now = now.with_nanosecond(0).unwrap_or(now);
        DateRange {
            start: now + self.start,
            end: now + self.end,
        }
    }
}

impl Default for LookaheadWindow {
    fn default() -> Self {
        Self::hours(23, 25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn parses_delivery_format() {
        assert_eq!(parse_delivery(" 18.02.2026 14:00 "), Ok(dt(18, 14, 0, 0)));
        assert!(matches!(
            parse_delivery("2026-02-18 14:00"),
            Err(ValidationError::BadDate { .. })
        ));
        assert!(parse_delivery("18.02.2026").is_err());
        assert_eq!(format_delivery(&dt(18, 9, 5, 0)), "18.02.2026 09:05");
    }

    #[test]
    fn single_day_report_covers_whole_day() {
        let r = DateRange::parse_report("18.02.2026").unwrap();
        assert_eq!(r.start, dt(18, 0, 0, 0));
        assert_eq!(r.end, dt(18, 23, 59, 59));
    }

    #[test]
    fn two_day_report_accepts_space_or_dash() {
        let a = DateRange::parse_report("18.02.2026 20.02.2026").unwrap();
        let b = DateRange::parse_report("18.02.2026 - 20.02.2026").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.end, dt(20, 23, 59, 59));
    }

    #[test]
    fn report_rejects_garbage_and_inverted_ranges() {
        assert!(DateRange::parse_report("").is_err());
        assert!(DateRange::parse_report("yesterday").is_err());
        assert!(DateRange::parse_report("1.1.2026 2.1.2026 3.1.2026").is_err());
        assert!(matches!(
            DateRange::parse_report("20.02.2026 18.02.2026"),
            Err(ValidationError::InvertedRange { .. })
        ));
    }

    #[test]
    fn lookahead_window_defaults_to_23_25_hours() {
        let now = dt(17, 14, 0, 0);
        let r = LookaheadWindow::default().range_from(now);
        assert_eq!(r.start, dt(18, 13, 0, 0));
        assert_eq!(r.end, dt(18, 15, 0, 0));
    }

    #[test]
    fn lookahead_window_drops_sub_seconds() {
        let now = dt(17, 14, 0, 0) + Duration::milliseconds(750);
        let r = LookaheadWindow::default().range_from(now);
        assert_eq!(r.start, dt(18, 13, 0, 0));
        assert_eq!(r.end, dt(18, 15, 0, 0));
    }
}

//! Calendar-day normalization.
//!
//! Every day boundary in the tracker is computed in UTC. An intake event's
//! `date` is a calendar day with no time component; timestamps coming in
//! from the outside are normalized here before they reach storage or the
//! aggregator.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// Storage and display format for calendar days.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// The inclusive UTC window `[00:00:00.000, 23:59:59.999]` of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Builds the window for a calendar day.
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        Self { date, start, end }
    }

    /// Builds the window containing the given instant.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self::for_date(instant.date_naive())
    }

    /// Returns true if the instant falls inside this day (both ends inclusive).
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting an end before the start.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::EndBeforeStart {
                start: format_day(start),
                end: format_day(end),
            });
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending at `last` inclusive.
    ///
    /// `days == 0` is treated as a single day.
    pub fn trailing(last: NaiveDate, days: u32) -> Self {
        let back = i64::from(days.saturating_sub(1));
        Self {
            start: last - Duration::days(back),
            end: last,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterates the days of the range, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Parses a calendar day from `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Timestamps carrying an offset are converted to UTC first, so
/// `2025-03-01T23:30:00-05:00` lands on `2025-03-02`.
pub fn parse_day(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DAY_FORMAT) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| DayWindow::containing(dt.with_timezone(&Utc)).date)
        .map_err(|_| ValidationError::InvalidDate {
            value: input.to_string(),
        })
}

/// Formats a calendar day as `YYYY-MM-DD`.
pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

/// Short chart label for a day, e.g. `Mon, Oct 13`.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

/// Rejects an optional end date that precedes its start date.
pub fn validate_span(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match end {
        Some(end) if end < start => Err(ValidationError::EndBeforeStart {
            start: format_day(start),
            end: format_day(end),
        }),
        _ => Ok(()),
    }
}

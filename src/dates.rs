//! Local-calendar date handling.
//!
//! Deadlines are stored as `YYYY-MM-DD` strings with no time component and
//! must be read as local midnight; reading them as UTC shifts the day for
//! anyone west of Greenwich.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};

use crate::error::{Error, Result};

/// Storage format for deadlines
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const NAIVE_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a stored date string into a local timestamp.
///
/// - `YYYY-MM-DD` is local midnight of that day.
/// - Strings containing `T` are parsed as-is (RFC 3339, or naive local time).
/// - Empty or unparsable input falls back to the current time.
pub fn parse_local_date(value: &str) -> DateTime<Local> {
    parse_local_date_at(value, Local::now())
}

/// [`parse_local_date`] with an explicit fallback instant.
pub fn parse_local_date_at(value: &str, fallback: DateTime<Local>) -> DateTime<Local> {
    try_parse_local_date(value).unwrap_or(fallback)
}

/// Parse a stored date string, `None` when empty or unparsable.
pub fn try_parse_local_date(value: &str) -> Option<DateTime<Local>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.contains('T') {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.with_timezone(&Local));
        }
        return NAIVE_DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .and_then(local_from_naive);
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(local_from_naive)
}

/// Local calendar day of a stored date string.
pub fn local_day(value: &str) -> NaiveDate {
    local_day_or(value, today())
}

/// Local calendar day of a stored date string, `today` when unparsable.
pub fn local_day_or(value: &str, today: NaiveDate) -> NaiveDate {
    try_parse_local_date(value)
        .map(|parsed| parsed.date_naive())
        .unwrap_or(today)
}

/// Current local calendar day
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a user-supplied date: `YYYY-MM-DD`, `today`, `tomorrow`, or `+N` days.
pub fn parse_date_arg(value: &str, today: NaiveDate) -> Result<NaiveDate> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "today" => return Ok(today),
        "tomorrow" => {
            return today
                .succ_opt()
                .ok_or_else(|| Error::InvalidArgument("date out of range".to_string()))
        }
        _ => {}
    }

    if let Some(offset) = value.strip_prefix('+') {
        let days: u64 = offset.parse().map_err(|_| {
            Error::InvalidArgument(format!("invalid day offset '{value}': expected +N"))
        })?;
        return today
            .checked_add_days(chrono::Days::new(days))
            .ok_or_else(|| Error::InvalidArgument("date out of range".to_string()));
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        Error::InvalidArgument(format!("invalid date '{value}': expected YYYY-MM-DD"))
    })
}

/// Parse `YYYY-MM` into the first day of that month.
pub fn parse_month_arg(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(&format!("{value}-01"), DATE_FORMAT).map_err(|_| {
        Error::InvalidArgument(format!("invalid month '{value}': expected YYYY-MM"))
    })
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Whole days from `today` to `deadline` (negative when past).
pub fn days_until(deadline: NaiveDate, today: NaiveDate) -> i64 {
    (deadline - today).num_days()
}

fn local_from_naive(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    // A wall-clock time skipped by a DST jump has no mapping; ambiguous ones take the earlier.
    Local.from_local_datetime(&naive).earliest()
}

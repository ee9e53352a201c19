//! Timestamp resolution for raw call records.
//!
//! Upstream producers send call start times as unix seconds, unix
//! milliseconds, digit strings, or free-form date strings. [`resolve_time`]
//! turns any of those into the display string served to clients.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::PLACEHOLDER;

/// Numbers above this are unix seconds; at or below it they are milliseconds.
const EPOCH_SECONDS_THRESHOLD: f64 = 1e9;

/// Minimum length of an all-digit string treated as unix seconds.
const MIN_EPOCH_DIGITS: usize = 10;

/// Display format for resolved instants (`11/14/2023, 10:13:20 PM`).
const DISPLAY_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Naive date-time layouts accepted after RFC 3339 and RFC 2822 fail.
/// Interpreted in the local time zone.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Renders an instant in the local time zone.
pub fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format(DISPLAY_FORMAT)
        .to_string()
}

/// Resolves a raw timestamp value into its display string.
///
/// - numbers: unix seconds above 1e9, unix milliseconds otherwise
/// - strings of ten or more digits: unix seconds
/// - other strings: general date parsing, or the string unchanged
/// - anything else (or `None`): [`PLACEHOLDER`]
pub fn resolve_time(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(instant_from_number)
            .map(format_local)
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        Some(Value::String(s)) => resolve_time_str(s),
        _ => PLACEHOLDER.to_string(),
    }
}

fn resolve_time_str(s: &str) -> String {
    if is_epoch_digits(s) {
        let instant = s
            .parse::<f64>()
            .ok()
            .and_then(|secs| instant_from_millis(secs * 1000.0));
        return match instant {
            Some(instant) => format_local(instant),
            None => s.to_string(),
        };
    }

    match parse_date(s) {
        Some(instant) => format_local(instant),
        None => s.to_string(),
    }
}

fn is_epoch_digits(s: &str) -> bool {
    s.len() >= MIN_EPOCH_DIGITS && s.bytes().all(|b| b.is_ascii_digit())
}

fn instant_from_number(n: f64) -> Option<DateTime<Utc>> {
    if n > EPOCH_SECONDS_THRESHOLD {
        instant_from_millis(n * 1000.0)
    } else {
        instant_from_millis(n)
    }
}

fn instant_from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

/// Best-effort parse of a free-form date string.
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return local_to_utc(naive);
        }
    }

    // ISO date-only forms are UTC midnight; slash-separated dates are local.
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return date.and_hms_opt(0, 0, 0).and_then(local_to_utc);
    }

    None
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

//! Publish timestamp parsing
//!
//! npm writes `time` entries as RFC 3339 strings (`2024-01-01T00:00:00.000Z`),
//! but mirrors and hand-edited documents carry looser ISO-8601 forms, such as
//! offsets without a colon (`+0000`). Offset-less values are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Date-time with a numeric offset in either `+hhmm` or `+hh:mm` form
const OFFSET_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Naive date-time layouts tried after RFC 3339
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse a `time` entry into an instant.
///
/// Returns `None` for non-string values and anything that is not a recognised
/// ISO-8601 form, meaning the version's age is unknown.
pub fn parse_publish_time(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_timestamp)
}

/// Parse an ISO-8601 timestamp string.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(raw, OFFSET_DATETIME_FORMAT) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|dt| dt.and_utc())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

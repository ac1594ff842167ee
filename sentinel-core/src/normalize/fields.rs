//! Field extraction shared by the JSON normalizers.
//!
//! "Missing" means absent, `null`, or an empty string. Numeric zero is a
//! value like any other.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sentinel_model::format_timestamp;
use serde_json::Value;

/// JSON number, or a string holding one.
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Non-empty string, or a number rendered as text (numeric ids).
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate that yields a number, in precedence order.
pub(crate) fn pick_number(candidates: &[Option<&Value>]) -> Option<f64> {
    candidates.iter().flatten().find_map(|value| number(value))
}

/// First candidate that yields text, in precedence order.
pub(crate) fn pick_text(candidates: &[Option<&Value>]) -> Option<String> {
    candidates.iter().flatten().find_map(|value| text(value))
}

/// Re-renders a source timestamp as ISO-8601 UTC.
///
/// Accepts RFC 3339, zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and
/// RFC 2822 (RSS `pubDate`). Anything else yields `None`.
pub(crate) fn iso_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_timestamp(parsed.with_timezone(&Utc)));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(format_timestamp(Utc.from_utc_datetime(&naive)));
        }
    }
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|parsed| format_timestamp(parsed.with_timezone(&Utc)))
}

pub(crate) fn timestamp_or_ingested(raw: Option<&str>, ingested_at: DateTime<Utc>) -> String {
    raw.and_then(iso_timestamp)
        .unwrap_or_else(|| format_timestamp(ingested_at))
}

/// Epoch milliseconds; fractional values are truncated.
pub(crate) fn epoch_millis_or_ingested(millis: Option<f64>, ingested_at: DateTime<Utc>) -> String {
    let instant = millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms.trunc() as i64).single())
        .unwrap_or(ingested_at);
    format_timestamp(instant)
}

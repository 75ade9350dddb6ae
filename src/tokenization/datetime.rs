//! # Date-Time Text Parsing
//!
//! ISO-8601 date-time text to epoch nanoseconds, on top of `chrono`.
//!
//! Accepted shapes, in probe order:
//!
//! | shape | example | zone |
//! |-------|---------|------|
//! | RFC 3339 | `2021-03-04T05:06:07.123456789Z` | explicit offset |
//! | space separator | `2021-03-04 05:06:07+02:00` | explicit offset |
//! | naive | `2021-03-04T05:06:07.5` | assumed UTC |
//! | named zone suffix | `2021-03-04T05:06:07 NY` | caller-supplied resolver |
//!
//! Date-only text is rejected; a time component is required. The named-zone
//! form is only recognized when the caller installed a
//! [`CustomTimeZoneParser`] on the tokenizer.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

/// Caller hook resolving trailing time-zone names (`"NY"`, `"UTC+5"`, ...)
/// that the ISO grammar does not cover.
pub trait CustomTimeZoneParser: Send + Sync {
    /// Offset for `zone`, or `None` if the name is not recognized.
    fn try_parse_zone(&self, zone: &str) -> Option<FixedOffset>;
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse `text` to epoch nanoseconds, or `None` if it is not a date-time.
pub fn parse_datetime_nanos(
    text: &str,
    zone_parser: Option<&dyn CustomTimeZoneParser>,
) -> Option<i64> {
    // Cheap structural pre-check: "YYYY-MM-DD" prefix with a separator.
    let bytes = text.as_bytes();
    if bytes.len() < 16 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if bytes[10] != b'T' && bytes[10] != b' ' {
        return None;
    }

    // Normalize the space separator so one grammar serves both shapes.
    let mut owned;
    let text = if bytes[10] == b' ' {
        owned = text.to_owned();
        // Only the date/time separator; a zone-name suffix keeps its space.
        owned.replace_range(10..11, "T");
        owned.as_str()
    } else {
        text
    };

    if let Ok(parsed) = DateTime::<FixedOffset>::parse_from_rfc3339(text) {
        return parsed.timestamp_nanos_opt();
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return naive.and_utc().timestamp_nanos_opt();
        }
    }

    // "<datetime> <zone-name>": split at the last space and ask the hook.
    if let (Some(zones), Some(split)) = (zone_parser, text.rfind(' ')) {
        let (stamp, zone) = (&text[..split], text[split + 1..].trim());
        if !zone.is_empty() {
            if let Some(offset) = zones.try_parse_zone(zone) {
                for format in NAIVE_FORMATS {
                    if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, format) {
                        return offset
                            .from_local_datetime(&naive)
                            .single()?
                            .timestamp_nanos_opt();
                    }
                }
            }
        }
    }

    None
}

//! Tracker timestamp parsing.
//!
//! Both trackers write ISO 8601 timestamps with a colon inside the UTC offset
//! (`2019-12-09T18:41:28.548+03:00`). The colon is removed before parsing so
//! the `%z` directive sees `+0300`.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

/// Format of tracker timestamps after offset correction.
pub const TRACKER_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

static OFFSET_COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([-+]\d{2}):(\d{2})$").unwrap());

/// Rewrites a trailing `±HH:MM` offset to `±HHMM`.
pub fn corrected_offset(timestamp: &str) -> Cow<'_, str> {
    OFFSET_COLON_RE.replace(timestamp.trim(), "${1}${2}")
}

/// Parses a tracker timestamp, keeping its original offset.
///
/// Timestamps ending in `Z` are accepted as RFC 3339.
pub fn parse_tracker_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let corrected = corrected_offset(raw);
    DateTime::parse_from_str(&corrected, TRACKER_DATE_FORMAT)
        .or_else(|err| DateTime::parse_from_rfc3339(raw.trim()).map_err(|_| err))
}

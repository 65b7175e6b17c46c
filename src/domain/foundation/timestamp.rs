//! UTC instants, and the HTTP-date form used for session expiry.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// HTTP-date style layout used for session expiry values, without the zone suffix.
const HTTP_DATE_LAYOUT: &str = "%a, %d %b %Y %H:%M:%S";

/// [`HTTP_DATE_LAYOUT`] after the weekday, which parsing ignores.
const DATE_TIME_LAYOUT: &str = "%d %b %Y %H:%M:%S";

/// A UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Strictly later than `other`.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Shifted by whole days; negative goes back.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Parses an HTTP-date such as `Tue, 19 Oct 2027 10:00:00 UTC`.
    ///
    /// Accepts a `UTC` or `GMT` suffix, and falls back to RFC 2822
    /// (`+0000` style offsets). The weekday name is not checked against the
    /// date, so `Mon, 01 Jan 2025 00:00:00 UTC` is the first of January.
    pub fn parse_http_date(value: &str) -> Result<Self, ValidationError> {
        let dated = strip_weekday(value.trim());
        let bare = dated
            .strip_suffix(" UTC")
            .or_else(|| dated.strip_suffix(" GMT"))
            .unwrap_or(dated);

        if let Ok(naive) = NaiveDateTime::parse_from_str(bare, DATE_TIME_LAYOUT) {
            return Ok(Self(naive.and_utc()));
        }

        DateTime::parse_from_rfc2822(dated)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| {
                ValidationError::invalid_format(
                    "expires",
                    format!("expected '{} UTC', got '{}'", HTTP_DATE_LAYOUT, value),
                )
            })
    }

    /// Formats as an HTTP-date with a literal `UTC` zone.
    pub fn to_http_date(&self) -> String {
        format!("{} UTC", self.0.format(HTTP_DATE_LAYOUT))
    }
}

/// Drops a leading `Xxx, ` day name.
fn strip_weekday(value: &str) -> &str {
    match value.split_once(", ") {
        Some((day, rest)) if day.len() == 3 && day.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest
        }
        _ => value,
    }
}

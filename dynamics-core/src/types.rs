//! Domain types shared by every tap crate.
//!
//! Watermarks are kept as the exact strings that were persisted or emitted;
//! comparison goes through the parsed instant whenever both sides parse.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Format an instant the way every emitted date-time value is written:
/// UTC, `Z` suffix, fractional seconds only when non-zero.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a timestamp string into a UTC instant.
///
/// Accepts RFC 3339 with an offset, a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// (read as UTC), and a bare `YYYY-MM-DD`.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

/// Last-seen value of a stream's replication field.
///
/// `==` and `Hash` compare the stored text, while [`Watermark::compare`]
/// orders by instant: `2020-03-01T00:00:00Z` and `2020-03-01T00:00:00+00:00`
/// compare `Equal` but are not `==`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(pub String);

impl Watermark {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The instant this watermark denotes, if it parses as a timestamp.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.0)
    }

    /// Order two watermarks by instant, falling back to string order when
    /// either side is not a timestamp.
    pub fn compare(&self, other: &Watermark) -> Ordering {
        match (self.instant(), other.instant()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }

    pub fn is_after(&self, other: &Watermark) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Watermark {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Watermark {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(format_datetime(dt))
    }
}

// ---------------------------------------------------------------------------
// Replication state
// ---------------------------------------------------------------------------

/// Persisted replication progress for a whole run.
///
/// Serialises to the Singer state shape:
/// `{"bookmarks": {"<stream>": "<watermark>"}, "currently_syncing": null}`.
/// Keys this tap does not own are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplicationState {
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Watermark>,
    #[serde(default)]
    pub currently_syncing: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReplicationState {
    pub fn bookmark(&self, stream: &str) -> Option<&Watermark> {
        self.bookmarks.get(stream)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One flat, normalised row ready for emission.
pub type Record = Map<String, Value>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

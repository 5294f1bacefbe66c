//! Best-effort timestamp resolution for feed entries.
//!
//! Feeds disagree on which date field they fill and how they format it. An
//! entry offers an ordered list of candidates; the first one that yields an
//! instant wins and anything unusable falls through to the next. An entry
//! with nothing usable is [`Timestamp::Unknown`], never an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Resolved publication time of an item.
///
/// `Unknown` orders below every `Resolved` instant, so a descending sort puts
/// undated items last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timestamp {
    Unknown,
    Resolved(DateTime<Utc>),
}

impl Timestamp {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Resolved(dt) => Some(*dt),
            Timestamp::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Timestamp::Resolved(_))
    }
}

impl From<Option<DateTime<Utc>>> for Timestamp {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Timestamp::Unknown, Timestamp::Resolved)
    }
}

/// One candidate date field of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDate {
    /// Already parsed by the feed parser
    Parsed(DateTime<Utc>),
    /// Raw text straight from the document
    Text(String),
    Missing,
}

impl From<Option<DateTime<Utc>>> for RawDate {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(RawDate::Missing, RawDate::Parsed)
    }
}

impl From<Option<String>> for RawDate {
    fn from(value: Option<String>) -> Self {
        value.map_or(RawDate::Missing, RawDate::Text)
    }
}

/// Resolve the first usable candidate, in order.
pub fn resolve_timestamp<I>(candidates: I) -> Timestamp
where
    I: IntoIterator<Item = RawDate>,
{
    candidates
        .into_iter()
        .find_map(|candidate| match candidate {
            RawDate::Parsed(dt) => Some(dt),
            RawDate::Text(text) => parse_date_text(&text),
            RawDate::Missing => None,
        })
        .into()
}

// Zoneless forms are taken as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Parse a date string in any of the shapes commonly found in feeds.
pub fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

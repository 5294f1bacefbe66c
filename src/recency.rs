//! Recency buckets: how long ago an item was published, for display tone.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};

use crate::timestamp::Timestamp;

/// Zone used to localize timestamps for display and day counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Local,
    Fixed(FixedOffset),
}

impl Zone {
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Zone::Local => instant.with_timezone(&Local).date_naive(),
            Zone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    pub fn format(&self, instant: DateTime<Utc>, format: &str) -> String {
        match self {
            Zone::Local => instant.with_timezone(&Local).format(format).to_string(),
            Zone::Fixed(offset) => instant.with_timezone(offset).format(format).to_string(),
        }
    }
}

/// Calendar days between `timestamp` and `now` in `zone`.
///
/// Timestamps in the future count as today. `None` when the timestamp is unknown.
pub fn days_since(timestamp: Timestamp, now: DateTime<Utc>, zone: Zone) -> Option<i64> {
    let instant = timestamp.instant()?;
    let days = (zone.date_of(now) - zone.date_of(instant)).num_days();
    Some(days.max(0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecencyBucket {
    Today,
    OneDay,
    TwoDays,
    ThreeDays,
    Older,
    Unknown,
}

impl RecencyBucket {
    pub const ALL: [RecencyBucket; 6] = [
        RecencyBucket::Today,
        RecencyBucket::OneDay,
        RecencyBucket::TwoDays,
        RecencyBucket::ThreeDays,
        RecencyBucket::Older,
        RecencyBucket::Unknown,
    ];

    pub fn from_days(days: Option<i64>) -> Self {
        match days {
            None => RecencyBucket::Unknown,
            Some(d) if d <= 0 => RecencyBucket::Today,
            Some(1) => RecencyBucket::OneDay,
            Some(2) => RecencyBucket::TwoDays,
            Some(3) => RecencyBucket::ThreeDays,
            Some(_) => RecencyBucket::Older,
        }
    }

    pub fn classify(timestamp: Timestamp, now: DateTime<Utc>, zone: Zone) -> Self {
        Self::from_days(days_since(timestamp, now, zone))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecencyBucket::Today => "today",
            RecencyBucket::OneDay => "1 day ago",
            RecencyBucket::TwoDays => "2 days ago",
            RecencyBucket::ThreeDays => "3 days ago",
            RecencyBucket::Older => "older",
            RecencyBucket::Unknown => "unknown date",
        }
    }

    pub fn tone(&self) -> &'static str {
        match self {
            RecencyBucket::Today => "#2e7d32",
            RecencyBucket::OneDay => "#558b2f",
            RecencyBucket::TwoDays => "#9e9d24",
            RecencyBucket::ThreeDays => "#ef6c00",
            RecencyBucket::Older => "#757575",
            RecencyBucket::Unknown => "#9e9e9e",
        }
    }

    /// CSS class suffix
    pub fn key(&self) -> &'static str {
        match self {
            RecencyBucket::Today => "today",
            RecencyBucket::OneDay => "day1",
            RecencyBucket::TwoDays => "day2",
            RecencyBucket::ThreeDays => "day3",
            RecencyBucket::Older => "older",
            RecencyBucket::Unknown => "unknown",
        }
    }
}

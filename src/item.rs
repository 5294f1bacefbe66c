use std::cmp::Ordering;

use crate::config::{FeedConfig, UnknownOrder};
use crate::timestamp::Timestamp;

/// A configured feed after fetching, with its display label settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Position in the config's feed list
    pub index: usize,
    pub label: String,
    pub color: Option<String>,
    /// The feed could not be fetched or parsed this run
    pub failed: bool,
}

impl Source {
    /// Label falls back from the configured name to the feed's own title to the URL.
    pub fn resolve(index: usize, config: &FeedConfig, feed_title: Option<&str>) -> Self {
        let label = non_blank(config.name.as_deref())
            .or_else(|| non_blank(feed_title))
            .unwrap_or(config.url.trim())
            .to_string();

        Self {
            index,
            label,
            color: config.color.clone(),
            failed: false,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// One normalized entry, the unit of sorting and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub source: String,
    pub source_index: usize,
    pub source_color: Option<String>,
    pub timestamp: Timestamp,
}

/// Newest first, undated items last.
///
/// The sort is stable: items with equal timestamps keep their input order,
/// and undated items are ordered by `unknown_order`.
pub fn sort_items(items: &mut [Item], unknown_order: UnknownOrder) {
    items.sort_by(|a, b| compare_items(a, b, unknown_order));
}

fn compare_items(a: &Item, b: &Item, unknown_order: UnknownOrder) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Timestamp::Unknown, Timestamp::Unknown) => match unknown_order {
            UnknownOrder::Fetch => Ordering::Equal,
            UnknownOrder::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            UnknownOrder::Source => a.source_index.cmp(&b.source_index),
        },
        (ta, tb) => tb.cmp(&ta),
    }
}

use feed_rs::model::Entry;
use tracing::{debug, warn};

use crate::fetcher::{RawDates, RawFeed};
use crate::item::{Item, Source};
use crate::timestamp::{resolve_timestamp, RawDate, Timestamp};

/// Turn a fetched feed into items attributed to `source`.
///
/// Entries without a link are dropped; `limit` caps how many are kept, in
/// document order.
pub fn normalize_feed(source: &Source, feed: &RawFeed, limit: Option<usize>) -> Vec<Item> {
    let mut items = Vec::new();

    for entry in &feed.entries {
        if limit.is_some_and(|max| items.len() >= max) {
            break;
        }
        if let Some(item) = normalize_entry(source, entry, feed.raw_dates_for(entry)) {
            items.push(item);
        }
    }

    debug!("Normalized {} items for '{}'", items.len(), source.label);
    items
}

pub fn normalize_entry(source: &Source, entry: &Entry, raw: Option<&RawDates>) -> Option<Item> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let link = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();

    if link.is_empty() {
        warn!("Skipping entry with no link: {}", title);
        return None;
    }

    Some(Item {
        title,
        link,
        source: source.label.clone(),
        source_index: source.index,
        source_color: source.color.clone(),
        timestamp: entry_timestamp(entry, raw),
    })
}

/// Parsed published, parsed updated, then the raw text of each.
pub fn entry_timestamp(entry: &Entry, raw: Option<&RawDates>) -> Timestamp {
    let raw = raw.cloned().unwrap_or_default();
    resolve_timestamp([
        RawDate::from(entry.published),
        RawDate::from(entry.updated),
        RawDate::from(raw.published),
        RawDate::from(raw.updated),
    ])
}

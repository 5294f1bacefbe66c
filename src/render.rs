use askama::Template;
use chrono::{DateTime, Utc};

use crate::config::{Config, Layout};
use crate::item::{Item, Source};
use crate::recency::{days_since, RecencyBucket, Zone};

// Template structs
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub title: String,
    pub heading: String,
    pub generated_at: String,
    pub filter: bool,
    pub total: usize,
    pub sources: Vec<SourceView>,
    pub buckets: Vec<BucketView>,
    pub sections: Vec<SectionView>,
}

pub struct SourceView {
    pub index: usize,
    pub label: String,
}

pub struct BucketView {
    pub key: &'static str,
    pub label: &'static str,
    pub tone: &'static str,
}

pub struct SectionView {
    pub heading: Option<String>,
    /// Shown in place of the list when the section has nothing to list
    pub note: Option<&'static str>,
    pub items: Vec<ItemView>,
}

pub struct ItemView {
    pub title: String,
    pub link: String,
    pub source: String,
    pub source_index: usize,
    /// Source color when configured, otherwise the recency tone
    pub color: String,
    pub bucket_key: &'static str,
    pub bucket_label: &'static str,
    pub tone: &'static str,
    pub date: String,
    /// Day count for the filter script, `unknown` when undated
    pub days: String,
}

impl ItemView {
    pub fn new(item: &Item, now: DateTime<Utc>, zone: Zone, display_format: &str) -> Self {
        let days = days_since(item.timestamp, now, zone);
        let bucket = RecencyBucket::from_days(days);

        Self {
            title: item.title.clone(),
            link: item.link.clone(),
            source: item.source.clone(),
            source_index: item.source_index,
            color: item
                .source_color
                .clone()
                .unwrap_or_else(|| bucket.tone().to_string()),
            bucket_key: bucket.key(),
            bucket_label: bucket.label(),
            tone: bucket.tone(),
            date: item
                .timestamp
                .instant()
                .map(|dt| zone.format(dt, display_format))
                .unwrap_or_else(|| bucket.label().to_string()),
            days: days.map_or_else(|| "unknown".to_string(), |d| d.to_string()),
        }
    }
}

/// Render the page for already sorted `items`.
///
/// Output depends only on the arguments, so identical inputs give identical
/// bytes; `now` drives the generation stamp and the recency buckets.
pub fn render_page(
    config: &Config,
    sources: &[Source],
    items: &[Item],
    now: DateTime<Utc>,
) -> askama::Result<String> {
    let zone = config.zone();
    let view = |item: &Item| ItemView::new(item, now, zone, &config.display_format);

    let sections = match config.layout {
        Layout::Timeline => vec![SectionView {
            heading: None,
            note: None,
            items: items.iter().map(view).collect(),
        }],
        Layout::Grouped => sources
            .iter()
            .map(|source| {
                let items: Vec<ItemView> = items
                    .iter()
                    .filter(|item| item.source_index == source.index)
                    .map(view)
                    .collect();
                let note = if source.failed {
                    Some("Feed could not be loaded.")
                } else if items.is_empty() {
                    Some("No items.")
                } else {
                    None
                };
                SectionView {
                    heading: Some(source.label.clone()),
                    note,
                    items,
                }
            })
            .collect(),
    };

    let page = PageTemplate {
        title: config.title.clone(),
        heading: config.heading().to_string(),
        generated_at: zone.format(now, &config.display_format),
        filter: config.filter,
        total: items.len(),
        sources: sources
            .iter()
            .map(|s| SourceView {
                index: s.index,
                label: s.label.clone(),
            })
            .collect(),
        buckets: RecencyBucket::ALL
            .iter()
            .map(|b| BucketView {
                key: b.key(),
                label: b.label(),
                tone: b.tone(),
            })
            .collect(),
        sections,
    };

    page.render()
}

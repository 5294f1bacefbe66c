use serde::Deserialize;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::FixedOffset;

use crate::recency::Zone;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Document title
    #[serde(default = "default_title")]
    pub title: String,
    /// Page heading, defaults to the title
    #[serde(default)]
    pub heading: Option<String>,
    /// Where the rendered page is written
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub unknown_order: UnknownOrder,
    /// Include the client-side filter controls
    #[serde(default = "default_filter")]
    pub filter: bool,
    #[serde(default)]
    pub max_items_per_feed: Option<usize>,
    /// Maximum number of feeds fetched at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Fixed zone for dates; the system zone is used when absent
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    #[serde(default = "default_display_format")]
    pub display_format: String,
    pub feeds: Vec<FeedConfig>,
}

fn default_title() -> String {
    "RSS digest".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("digest.html")
}

fn default_filter() -> bool {
    true
}

fn default_max_concurrent() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    30
}

fn default_display_format() -> String {
    "%d.%m.%Y %H:%M".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Label shown next to each item; the feed's own title is used when absent
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    /// CSS color for this source's items
    #[serde(default)]
    pub color: Option<String>,
}

/// How the page arranges items.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One list merged across all sources
    #[default]
    Timeline,
    /// One section per source, in config order
    Grouped,
}

/// Tie-break among items whose timestamp could not be resolved.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOrder {
    /// Keep fetch order: config order, then order within the feed
    #[default]
    Fetch,
    Title,
    Source,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be at least 1");
        }
        if let Some(minutes) = self.utc_offset_minutes {
            if offset_from_minutes(minutes).is_none() {
                anyhow::bail!("utc_offset_minutes out of range: {}", minutes);
            }
        }
        if StrftimeItems::new(&self.display_format).any(|item| matches!(item, Item::Error)) {
            anyhow::bail!("invalid display_format: {:?}", self.display_format);
        }
        for feed in &self.feeds {
            if feed.url.trim().is_empty() {
                anyhow::bail!("feed url must not be empty");
            }
        }
        Ok(())
    }

    pub fn heading(&self) -> &str {
        self.heading.as_deref().unwrap_or(&self.title)
    }

    pub fn zone(&self) -> Zone {
        match self.utc_offset_minutes.and_then(offset_from_minutes) {
            Some(offset) => Zone::Fixed(offset),
            None => Zone::Local,
        }
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

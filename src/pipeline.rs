use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::config::Config;
use crate::fetcher::{FetchError, Fetcher, RawFeed};
use crate::item::{sort_items, Item, Source};
use crate::normalize::normalize_feed;
use crate::render::render_page;

/// Everything gathered from one round of fetching, sorted and ready to render.
#[derive(Debug)]
pub struct Digest {
    pub sources: Vec<Source>,
    pub items: Vec<Item>,
    /// Labels of sources that could not be fetched or parsed
    pub failed: Vec<String>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub items: usize,
    pub sources: usize,
    pub failed: Vec<String>,
    pub output: PathBuf,
}

/// Fetch, normalize, sort, render and write the page.
pub async fn run(
    config: &Config,
    fetcher: &Fetcher,
    now: DateTime<Utc>,
) -> anyhow::Result<RunSummary> {
    let results = fetcher.fetch_all(&config.feeds).await;
    let digest = collect(config, results)?;

    let html = render_page(config, &digest.sources, &digest.items, now)
        .context("failed to render page")?;
    write_page(&config.output, &html)?;

    info!(
        "Wrote {} items from {} sources to {}",
        digest.items.len(),
        digest.sources.len() - digest.failed.len(),
        config.output.display()
    );

    Ok(RunSummary {
        items: digest.items.len(),
        sources: digest.sources.len(),
        failed: digest.failed,
        output: config.output.clone(),
    })
}

/// Merge fetch results into one sorted digest.
///
/// `results` must line up with `config.feeds`. A failed source is logged and
/// skipped; the digest is an error only when every source failed.
pub fn collect(
    config: &Config,
    results: Vec<Result<RawFeed, FetchError>>,
) -> anyhow::Result<Digest> {
    let mut sources = Vec::with_capacity(config.feeds.len());
    let mut items = Vec::new();
    let mut failed = Vec::new();

    for (index, (feed_config, result)) in config.feeds.iter().zip(results).enumerate() {
        match result {
            Ok(feed) => {
                let source = Source::resolve(index, feed_config, feed.title.as_deref());
                items.extend(normalize_feed(&source, &feed, config.max_items_per_feed));
                sources.push(source);
            }
            Err(e) => {
                let source = Source {
                    failed: true,
                    ..Source::resolve(index, feed_config, None)
                };
                error!("Failed to fetch feed '{}': {}", source.label, e);
                failed.push(source.label.clone());
                sources.push(source);
            }
        }
    }

    if !config.feeds.is_empty() && failed.len() == config.feeds.len() {
        anyhow::bail!("all {} feeds failed to load", failed.len());
    }

    sort_items(&mut items, config.unknown_order);

    Ok(Digest {
        sources,
        items,
        failed,
    })
}

pub fn write_page(path: &Path, html: &str) -> anyhow::Result<()> {
    std::fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
}

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rss_digest::config::Config;
use rss_digest::fetcher::Fetcher;
use rss_digest::pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rss_digest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("feeds.toml")?;
    info!("Loaded {} feeds from configuration", config.feeds.len());

    let fetcher = Fetcher::from_config(&config)?;
    let summary = pipeline::run(&config, &fetcher, Utc::now()).await?;

    if !summary.failed.is_empty() {
        warn!(
            "{} of {} feeds failed: {}",
            summary.failed.len(),
            summary.sources,
            summary.failed.join(", ")
        );
    }
    info!("Done, open {} in a browser", summary.output.display());

    Ok(())
}

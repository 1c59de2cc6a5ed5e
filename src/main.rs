use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use tracing::{error, info, warn};

use product_crawler::config::Config;
use product_crawler::storage::JsonFileStore;
use product_crawler::utils::http::{create_client, HttpFetcher};
use product_crawler::{CategoryOutcome, CrawlSettings, Crawler};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("product_crawler=info".parse()?);
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(
        "Starting product crawler at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let rules = config
        .site_rules()?
        .compile()
        .context("Site rules contain an invalid selector")?;
    info!("Using site rules '{}'", rules.name());

    let categories = config.load_categories()?;
    if categories.is_empty() {
        return Ok(());
    }

    // One pooled client shared by every request
    let client = create_client(&config.http)?;
    let fetcher = Arc::new(HttpFetcher::new(client, config.http.user_agents.clone()));
    let store = Arc::new(JsonFileStore::new(&config.output.dir, config.output.shape));

    let crawler = Crawler::new(
        fetcher,
        Arc::new(rules),
        store,
        CrawlSettings::from(&config),
    );

    let outcomes = crawler.run(&categories).await;

    for (name, outcome) in &outcomes {
        match outcome {
            CategoryOutcome::Skipped { path } => {
                info!("{}: skipped, {} already exists", name, path.display())
            }
            CategoryOutcome::Completed { saved, failed } => {
                info!("{}: {} products saved, {} failed", name, saved, failed)
            }
            CategoryOutcome::Empty => warn!("{}: no products found, will retry next run", name),
            CategoryOutcome::Failed { reason } => error!("{}: {}", name, reason),
        }
    }

    info!("All categories have been fetched and saved");
    Ok(())
}

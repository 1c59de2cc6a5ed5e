use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::crawler::FailurePolicy;
use crate::models::{CategoryTask, Site};
use crate::sites::SiteRules;
use crate::storage::OutputShape;
use crate::utils::delay::DelayRange;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: Site,
    /// JSON selector table replacing the built-in preset.
    pub rules_file: Option<PathBuf>,
    pub categories: Vec<CategoryTask>,
    /// Flat `name url` list, merged after `categories`.
    pub categories_file: PathBuf,
    pub category_delay: DelayRange,
    pub http: HttpConfig,
    pub pagination: PaginationConfig,
    pub retry: RetrySettings,
    pub batch: BatchConfig,
    pub output: OutputConfig,
    pub log_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Rotated per request; the first one is also the client default.
    pub user_agents: Vec<String>,
    pub timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub max_pages: u32,
    pub page_delay: DelayRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub retries: u32,
    pub delay: DelayRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub search: RetryConfig,
    pub product: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: usize,
    pub delay: DelayRange,
    /// Take a long pause after this many product requests.
    pub cooldown_after: Option<u32>,
    pub cooldown: DelayRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub skip_existing: bool,
    /// Rewrite the file after every search page instead of once at the end.
    pub save_every_page: bool,
    pub shape: OutputShape,
    pub failure_policy: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: Site::Amazon,
            rules_file: None,
            categories: Vec::new(),
            categories_file: PathBuf::from("categories.txt"),
            category_delay: DelayRange::fixed(10_000),
            http: HttpConfig::default(),
            pagination: PaginationConfig::default(),
            retry: RetrySettings::default(),
            batch: BatchConfig::default(),
            output: OutputConfig::default(),
            log_json: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
            ],
            timeout_secs: 25,
            pool_max_idle_per_host: 6,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            page_delay: DelayRange::fixed(1_000),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: DelayRange::between(10_000, 20_000),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            search: RetryConfig {
                retries: 3,
                delay: DelayRange::between(60_000, 180_000),
            },
            product: RetryConfig::default(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 10,
            delay: DelayRange::between(1_000, 3_000),
            cooldown_after: Some(30),
            cooldown: DelayRange::between(60_000, 180_000),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            skip_existing: true,
            save_every_page: false,
            shape: OutputShape::Envelope,
            failure_policy: FailurePolicy::Drop,
        }
    }
}

impl Config {
    /// Defaults, then `crawler.toml` (or the file named by `CRAWLER_CONFIG`),
    /// then `CRAWLER__*` environment variables.
    pub fn load() -> Result<Self> {
        let path = std::env::var("CRAWLER_CONFIG").unwrap_or_else(|_| "crawler".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix("CRAWLER").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch.size > 0, "batch.size must be greater than 0");
        ensure!(
            self.pagination.max_pages > 0,
            "pagination.max_pages must be greater than 0"
        );
        ensure!(self.http.timeout_secs > 0, "http.timeout_secs must be greater than 0");

        let ranges = [
            ("category_delay", &self.category_delay),
            ("pagination.page_delay", &self.pagination.page_delay),
            ("retry.search.delay", &self.retry.search.delay),
            ("retry.product.delay", &self.retry.product.delay),
            ("batch.delay", &self.batch.delay),
            ("batch.cooldown", &self.batch.cooldown),
        ];
        for (name, range) in ranges {
            ensure!(range.is_valid(), "{}: min_ms must not exceed max_ms", name);
        }

        Ok(())
    }

    /// Selector table for this run: the rules file when given, else the preset.
    pub fn site_rules(&self) -> Result<SiteRules> {
        match &self.rules_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read rules file {}", path.display()))?;
                let rules: SiteRules = serde_json::from_str(&content)
                    .with_context(|| format!("Invalid rules file {}", path.display()))?;
                info!("Loaded site rules '{}' from {}", rules.name, path.display());
                Ok(rules)
            }
            None => Ok(self.site.rules()),
        }
    }

    pub fn load_categories(&self) -> Result<Vec<CategoryTask>> {
        let mut tasks = self.categories.clone();
        tasks.extend(read_categories_file(&self.categories_file)?);

        if tasks.is_empty() {
            warn!(
                "No categories configured and none found in {}",
                self.categories_file.display()
            );
        }
        Ok(tasks)
    }
}

fn read_categories_file(path: &Path) -> Result<Vec<CategoryTask>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read categories file {}", path.display()))?;
    let tasks = CategoryTask::parse_list(&content);
    info!("Loaded {} categories from {}", tasks.len(), path.display());
    Ok(tasks)
}

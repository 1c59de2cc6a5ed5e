use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{BatchConfig, Config, PaginationConfig};
use crate::error::CrawlResult;
use crate::models::{CategoryTask, ItemId, ProductRecord, ResultFile};
use crate::paginator::Paginator;
use crate::parsers::extract_product;
use crate::retry::RetryPolicy;
use crate::scheduler::BatchScheduler;
use crate::sites::CompiledRules;
use crate::storage::ResultStore;
use crate::utils::delay::DelayRange;
use crate::utils::http::Fetcher;

/// What happens to a product that could not be fetched or named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave it out of the result file.
    Drop,
    /// Keep an "Unknown Product" entry carrying only the identifier.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// Output already existed and was left untouched.
    Skipped { path: PathBuf },
    Completed { saved: usize, failed: usize },
    /// The search produced no identifiers; nothing was written, so the
    /// next run tries again.
    Empty,
    /// The result file could not be written.
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub search_retry: RetryPolicy,
    pub product_retry: RetryPolicy,
    pub pagination: PaginationConfig,
    pub batch: BatchConfig,
    pub failure_policy: FailurePolicy,
    pub skip_existing: bool,
    pub save_every_page: bool,
    pub category_delay: DelayRange,
}

impl From<&Config> for CrawlSettings {
    fn from(config: &Config) -> Self {
        Self {
            search_retry: RetryPolicy::from(&config.retry.search),
            product_retry: RetryPolicy::from(&config.retry.product),
            pagination: config.pagination.clone(),
            batch: config.batch.clone(),
            failure_policy: config.output.failure_policy,
            skip_existing: config.output.skip_existing,
            save_every_page: config.output.save_every_page,
            category_delay: config.category_delay,
        }
    }
}

pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    rules: Arc<CompiledRules>,
    store: Arc<dyn ResultStore>,
    settings: CrawlSettings,
}

/// Products collected so far for one category.
#[derive(Default)]
struct Harvest {
    products: Vec<ProductRecord>,
    failed: usize,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        rules: Arc<CompiledRules>,
        store: Arc<dyn ResultStore>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            fetcher,
            rules,
            store,
            settings,
        }
    }

    /// Crawl every category in order. A failing category is logged and the
    /// run moves on to the next one.
    pub async fn run(&self, tasks: &[CategoryTask]) -> Vec<(String, CategoryOutcome)> {
        let mut outcomes = Vec::with_capacity(tasks.len());

        for (idx, task) in tasks.iter().enumerate() {
            info!("Begin fetching category: {}", task.name);

            let outcome = match self.crawl_category(task).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Failed to save category {}: {}", task.name, e);
                    CategoryOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            let touched_network = !matches!(outcome, CategoryOutcome::Skipped { .. });
            outcomes.push((task.name.clone(), outcome));

            if touched_network && idx + 1 < tasks.len() {
                self.settings.category_delay.wait().await;
            }
        }

        outcomes
    }

    pub async fn crawl_category(&self, task: &CategoryTask) -> CrawlResult<CategoryOutcome> {
        if self.settings.skip_existing && self.store.exists(&task.name).await {
            let path = self.store.path_for(&task.name);
            info!(
                "Skipping category {}: {} already exists",
                task.name,
                path.display()
            );
            return Ok(CategoryOutcome::Skipped { path });
        }

        let mut paginator = Paginator::new(
            &*self.fetcher,
            &self.rules,
            self.settings.search_retry,
            self.settings.pagination.page_delay,
            self.settings.pagination.max_pages,
            &task.search_url,
        );
        let mut scheduler = BatchScheduler::new(&self.settings.batch);
        let mut harvest = Harvest::default();

        if self.settings.save_every_page {
            let mut pages = 0;
            while let Some(page) = paginator.next_page().await {
                pages += 1;
                info!(
                    "Found {} identifiers on page {} for category {}",
                    page.identifiers.len(),
                    page.number,
                    task.name
                );
                self.resolve(&mut scheduler, &page.identifiers, page.cards, &mut harvest)
                    .await;
                self.store
                    .save(&task.name, &ResultFile::new(harvest.products.clone()))
                    .await?;
            }
            if pages == 0 {
                warn!("No identifiers found for category {}, nothing saved", task.name);
                return Ok(CategoryOutcome::Empty);
            }
        } else {
            let results = paginator.collect_all().await;
            if results.identifiers.is_empty() {
                warn!("No identifiers found for category {}, nothing saved", task.name);
                return Ok(CategoryOutcome::Empty);
            }
            info!(
                "Found {} identifiers for category {}",
                results.identifiers.len(),
                task.name
            );
            self.resolve(&mut scheduler, &results.identifiers, results.cards, &mut harvest)
                .await;
        }

        let saved = harvest.products.len();
        self.store
            .save(&task.name, &ResultFile::new(harvest.products))
            .await?;

        info!(
            "Finished category {}: {} saved, {} failed",
            task.name, saved, harvest.failed
        );
        Ok(CategoryOutcome::Completed {
            saved,
            failed: harvest.failed,
        })
    }

    /// Turn identifiers into records: detail pages are fetched when the site
    /// has them, then merged over any listing card for the same identifier.
    async fn resolve(
        &self,
        scheduler: &mut BatchScheduler,
        identifiers: &[ItemId],
        mut cards: HashMap<ItemId, ProductRecord>,
        harvest: &mut Harvest,
    ) {
        let fetched = if self.rules.has_detail_page() {
            scheduler
                .run(identifiers, |id| self.fetch_product(id.clone()))
                .await
        } else {
            identifiers.iter().map(|id| (id.clone(), None)).collect()
        };

        for (id, detail) in fetched {
            let record = match (cards.remove(&id), detail) {
                (Some(card), Some(detail)) => Some(card.merge_detail(detail)),
                (Some(card), None) => Some(card),
                (None, detail) => detail,
            };

            match record {
                Some(record) if record.has_name() => harvest.products.push(record),
                other => {
                    if other.is_some() {
                        warn!("Product {} has no title", id);
                    }
                    harvest.failed += 1;
                    match self.settings.failure_policy {
                        FailurePolicy::Drop => debug!("Dropping product {}", id),
                        FailurePolicy::Placeholder => harvest
                            .products
                            .push(other.unwrap_or_else(|| ProductRecord::placeholder(id))),
                    }
                }
            }
        }
    }

    async fn fetch_product(&self, id: ItemId) -> (ItemId, Option<ProductRecord>) {
        let Some(url) = self.rules.product_url(&id) else {
            return (id, None);
        };
        let fetcher = &*self.fetcher;
        let rules = &*self.rules;
        let url_ref = url.as_str();
        let id_ref = &id;

        let record = self
            .settings
            .product_retry
            .run(&format!("product {}", id), || async move {
                let html = fetcher.fetch(url_ref).await?;
                extract_product(&html, url_ref, id_ref, rules)
            })
            .await;

        (id, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use crate::models::Site;
    use crate::storage::{JsonFileStore, OutputShape};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Every page is an anti-bot page.
    struct BlockedFetcher;

    #[async_trait]
    impl Fetcher for BlockedFetcher {
        async fn fetch(&self, url: &str) -> CrawlResult<String> {
            Err(CrawlError::Blocked {
                url: url.to_string(),
            })
        }
    }

    /// Serves one search result page per category; product pages are blocked.
    struct SearchOnlyFetcher;

    #[async_trait]
    impl Fetcher for SearchOnlyFetcher {
        async fn fetch(&self, url: &str) -> CrawlResult<String> {
            if url.contains("/s?") {
                Ok(r#"<div data-asin="B000000001"></div>"#.to_string())
            } else {
                Err(CrawlError::Blocked {
                    url: url.to_string(),
                })
            }
        }
    }

    /// Hands out canned pages and counts requests.
    struct PageFetcher {
        html: String,
        requests: Mutex<usize>,
    }

    #[async_trait]
    impl Fetcher for PageFetcher {
        async fn fetch(&self, _url: &str) -> CrawlResult<String> {
            let mut requests = self.requests.lock().unwrap();
            *requests += 1;
            if *requests == 1 {
                Ok(self.html.clone())
            } else {
                Ok(String::new())
            }
        }
    }

    /// Refuses to save one category and records the rest.
    struct PickyStore {
        refuse: &'static str,
        saved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResultStore for PickyStore {
        async fn exists(&self, _category: &str) -> bool {
            false
        }

        async fn save(&self, category: &str, _file: &ResultFile) -> CrawlResult<PathBuf> {
            if category == self.refuse {
                return Err(std::io::Error::other("disk full").into());
            }
            self.saved.lock().unwrap().push(category.to_string());
            Ok(self.path_for(category))
        }

        fn path_for(&self, category: &str) -> PathBuf {
            PathBuf::from(format!("{}.json", category))
        }
    }

    fn settings() -> CrawlSettings {
        CrawlSettings {
            search_retry: RetryPolicy::new(0, DelayRange::ZERO),
            product_retry: RetryPolicy::new(0, DelayRange::ZERO),
            pagination: PaginationConfig {
                max_pages: 3,
                page_delay: DelayRange::ZERO,
            },
            batch: BatchConfig {
                size: 2,
                delay: DelayRange::ZERO,
                cooldown_after: None,
                cooldown: DelayRange::ZERO,
            },
            failure_policy: FailurePolicy::Drop,
            skip_existing: true,
            save_every_page: false,
            category_delay: DelayRange::ZERO,
        }
    }

    fn crawler(fetcher: Arc<dyn Fetcher>, site: Site, store: Arc<dyn ResultStore>) -> Crawler {
        crawler_with(fetcher, site, store, settings())
    }

    fn crawler_with(
        fetcher: Arc<dyn Fetcher>,
        site: Site,
        store: Arc<dyn ResultStore>,
        settings: CrawlSettings,
    ) -> Crawler {
        Crawler::new(
            fetcher,
            Arc::new(site.rules().compile().unwrap()),
            store,
            settings,
        )
    }

    #[tokio::test]
    async fn save_failure_does_not_stop_the_run() {
        let store = Arc::new(PickyStore {
            refuse: "keyboard",
            saved: Mutex::new(Vec::new()),
        });
        let crawler = crawler(Arc::new(SearchOnlyFetcher), Site::Amazon, store.clone());
        let tasks = [
            CategoryTask::new("keyboard", "https://www.amazon.com/s?k=keyboard"),
            CategoryTask::new("mouse", "https://www.amazon.com/s?k=mouse"),
        ];

        let outcomes = crawler.run(&tasks).await;

        assert!(matches!(outcomes[0].1, CategoryOutcome::Failed { .. }));
        assert_eq!(
            outcomes[1],
            (
                "mouse".to_string(),
                CategoryOutcome::Completed { saved: 0, failed: 1 }
            )
        );
        assert_eq!(*store.saved.lock().unwrap(), vec!["mouse".to_string()]);
    }

    #[tokio::test]
    async fn blocked_search_is_retried_on_the_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path(), OutputShape::Envelope));
        let task = CategoryTask::new("mouse", "https://www.amazon.com/s?k=mouse");

        for save_every_page in [false, true] {
            let crawler = crawler_with(
                Arc::new(BlockedFetcher),
                Site::Amazon,
                store.clone(),
                CrawlSettings {
                    save_every_page,
                    ..settings()
                },
            );

            let first = crawler.crawl_category(&task).await.unwrap();
            assert_eq!(first, CategoryOutcome::Empty);
            assert!(!store.exists("mouse").await);

            let second = crawler.crawl_category(&task).await.unwrap();
            assert_eq!(second, CategoryOutcome::Empty);
        }
    }

    #[tokio::test]
    async fn card_only_site_needs_no_product_requests() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path(), OutputShape::Envelope));
        let fetcher = Arc::new(PageFetcher {
            html: r#"
                <div class="Bm3ON" data-item-id="11"><div class="RfADt"><a>Mouse</a></div></div>
                <div class="Bm3ON" data-item-id="12"><div class="ooOxS">50.000</div></div>
                <div class="Bm3ON" data-item-id="13"><div class="RfADt"><a>Pad</a></div></div>
            "#
            .to_string(),
            requests: Mutex::new(0),
        });
        let crawler = crawler(fetcher.clone(), Site::Lazada, store.clone());

        let outcome = crawler
            .crawl_category(&CategoryTask::new(
                "mouse",
                "https://www.lazada.vn/catalog/?q=mouse",
            ))
            .await
            .unwrap();

        // one result page plus the empty page that ends the walk
        assert_eq!(*fetcher.requests.lock().unwrap(), 2);
        assert_eq!(outcome, CategoryOutcome::Completed { saved: 2, failed: 1 });

        let raw = std::fs::read_to_string(store.path_for("mouse")).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved["totalProducts"], 2);
        assert_eq!(saved["products"][0]["name"], "Mouse");
        assert_eq!(saved["products"][1]["name"], "Pad");
    }

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.output.failure_policy = FailurePolicy::Placeholder;
        config.retry.product.retries = 7;

        let settings = CrawlSettings::from(&config);
        assert_eq!(settings.failure_policy, FailurePolicy::Placeholder);
        assert_eq!(settings.product_retry.retries, 7);
        assert_eq!(settings.search_retry.retries, 3);
        assert!(settings.skip_existing);
    }
}

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use url::Url;

use crate::models::{ItemId, ProductRecord};
use crate::parsers::extract_listing;
use crate::retry::RetryPolicy;
use crate::sites::CompiledRules;
use crate::utils::delay::DelayRange;
use crate::utils::http::Fetcher;

/// Identifiers first seen on one search page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub number: u32,
    pub identifiers: Vec<ItemId>,
    /// Card records for those identifiers, if the site has cards.
    pub cards: HashMap<ItemId, ProductRecord>,
}

/// Everything one search produced, across all of its pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub identifiers: Vec<ItemId>,
    pub cards: HashMap<ItemId, ProductRecord>,
}

/// Walks the result pages of one category search.
///
/// Stops at the first page that adds nothing new, when the site stops
/// offering a next page, or at `max_pages`, whichever comes first. A page
/// that still fails after retries counts as empty.
pub struct Paginator<'a> {
    fetcher: &'a dyn Fetcher,
    rules: &'a CompiledRules,
    retry: RetryPolicy,
    page_delay: DelayRange,
    max_pages: u32,
    base_url: String,
    next: u32,
    finished: bool,
    seen: HashSet<ItemId>,
}

impl<'a> Paginator<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        rules: &'a CompiledRules,
        retry: RetryPolicy,
        page_delay: DelayRange,
        max_pages: u32,
        base_url: &str,
    ) -> Self {
        Self {
            fetcher,
            rules,
            retry,
            page_delay,
            max_pages,
            base_url: base_url.to_string(),
            next: 1,
            finished: false,
            seen: HashSet::new(),
        }
    }

    pub async fn next_page(&mut self) -> Option<SearchPage> {
        if self.finished || self.next > self.max_pages {
            return None;
        }
        if self.next > 1 {
            self.page_delay.wait().await;
        }

        let number = self.next;
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => self.finished = true,
        }

        let url = page_url(&self.base_url, self.rules.page_param(), number);
        debug!("Fetching search page {}: {}", number, url);

        let fetcher = self.fetcher;
        let rules = self.rules;
        let url = url.as_str();
        let listing = self
            .retry
            .run(&format!("search page {}", number), || async move {
                let html = fetcher.fetch(url).await?;
                extract_listing(&html, url, rules)
            })
            .await;

        let Some(listing) = listing else {
            self.finished = true;
            return None;
        };

        let mut cards = listing.cards;
        let identifiers: Vec<ItemId> = listing
            .identifiers
            .into_iter()
            .filter(|id| self.seen.insert(id.clone()))
            .collect();
        cards.retain(|id, _| identifiers.contains(id));

        if identifiers.is_empty() {
            info!("No new products found on page {}", number);
            self.finished = true;
            return None;
        }
        if !listing.has_next {
            debug!("Page {} has no next page link", number);
            self.finished = true;
        }

        Some(SearchPage {
            number,
            identifiers,
            cards,
        })
    }

    /// Drain every page into one deduplicated list.
    pub async fn collect_all(mut self) -> SearchResults {
        let mut all = SearchResults::default();
        while let Some(page) = self.next_page().await {
            info!(
                "Found {} identifiers on page {}",
                page.identifiers.len(),
                page.number
            );
            all.identifiers.extend(page.identifiers);
            all.cards.extend(page.cards);
        }
        all
    }
}

/// Point `base` at result page `page`, replacing any page parameter it
/// already carries.
pub fn page_url(base: &str, param: &str, page: u32) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| &**key != param)
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();

            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair(param, &page.to_string());
            url.to_string()
        }
        Err(_) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{}{}{}={}", base, separator, param, page)
        }
    }
}

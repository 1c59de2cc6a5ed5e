use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{CrawlError, CrawlResult};

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Retrieves the raw markup behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> CrawlResult<String>;
}

pub fn create_client(config: &HttpConfig) -> CrawlResult<Client> {
    let default_agent = config
        .user_agents
        .first()
        .map(String::as_str)
        .unwrap_or("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36");

    let client = ClientBuilder::new()
        .user_agent(default_agent)
        .cookie_store(true)
        .gzip(true)
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .build()
        .map_err(|source| CrawlError::Request {
            url: String::new(),
            source,
        })?;

    Ok(client)
}

/// Plain HTTPS GET with a browser-like header set.
pub struct HttpFetcher {
    client: Client,
    user_agents: Vec<String>,
}

impl HttpFetcher {
    pub fn new(client: Client, user_agents: Vec<String>) -> Self {
        Self {
            client,
            user_agents,
        }
    }

    fn pick_user_agent(&self) -> Option<&str> {
        self.user_agents
            .choose(&mut rand::rng())
            .map(String::as_str)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> CrawlResult<String> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9");

        if let Some(agent) = self.pick_user_agent() {
            request = request.header(USER_AGENT, agent);
        }

        debug!("GET {}", url);
        let response = request.send().await.map_err(|source| CrawlError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP error {}: {}", status, url);
            return Err(CrawlError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| CrawlError::Request {
            url: url.to_string(),
            source,
        })
    }
}

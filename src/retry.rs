use std::future::Future;
use tracing::{error, warn};

use crate::config::RetryConfig;
use crate::error::CrawlResult;
use crate::utils::delay::DelayRange;

/// Fixed-count retry with a fixed or randomized pause between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts made after the first one.
    pub retries: u32,
    pub delay: DelayRange,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            retries: config.retries,
            delay: config.delay,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: DelayRange) -> Self {
        Self { retries, delay }
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// Returns `None` once the operation is given up on; the error has
    /// already been logged at that point.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CrawlResult<T>>,
    {
        let attempts = self.retries.saturating_add(1);

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Some(value),
                Err(e) if !e.is_retryable() => {
                    error!("Giving up on {}: {}", what, e);
                    return None;
                }
                Err(e) if attempt < attempts => {
                    let wait = self.delay.sample();
                    warn!(
                        "{} failed: {}. Retrying in {:?} ({} attempts remaining)",
                        what,
                        e,
                        wait,
                        attempts - attempt
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    error!("Error fetching {} after {} attempts: {}", what, attempts, e);
                }
            }
        }

        None
    }
}

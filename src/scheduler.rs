use futures::future::join_all;
use std::future::Future;
use tracing::info;

use crate::config::BatchConfig;
use crate::utils::delay::DelayRange;

/// Runs work in fixed-size concurrent groups with pauses in between.
pub struct BatchScheduler {
    batch_size: usize,
    batch_delay: DelayRange,
    cooldown_after: Option<u32>,
    cooldown: DelayRange,
    requests_since_cooldown: u32,
}

impl BatchScheduler {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            batch_size: config.size.max(1),
            batch_delay: config.delay,
            cooldown_after: config.cooldown_after.filter(|n| *n > 0),
            cooldown: config.cooldown,
            requests_since_cooldown: 0,
        }
    }

    /// Apply `task` to every item. Each group runs concurrently and is
    /// awaited in full, so one failure never cuts a group short. Results
    /// keep the input order.
    pub async fn run<I, T, F, Fut>(&mut self, items: &[I], task: F) -> Vec<T>
    where
        F: Fn(&I) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut results = Vec::with_capacity(items.len());
        let total_batches = items.len().div_ceil(self.batch_size);

        for (idx, batch) in items.chunks(self.batch_size).enumerate() {
            results.extend(join_all(batch.iter().map(&task)).await);

            self.requests_since_cooldown = self
                .requests_since_cooldown
                .saturating_add(batch.len() as u32);
            if idx + 1 == total_batches {
                break;
            }

            match self.cooldown_after {
                Some(limit) if self.requests_since_cooldown >= limit => {
                    info!(
                        "Pausing after {} requests to avoid detection",
                        self.requests_since_cooldown
                    );
                    self.cooldown.wait().await;
                    self.requests_since_cooldown = 0;
                }
                _ => self.batch_delay.wait().await,
            }
        }

        results
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CrawlResult;
use crate::models::ResultFile;

mod json;
pub use json::JsonFileStore;

/// Layout of a saved result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    /// `{ "totalProducts": n, "products": [...] }`
    Envelope,
    /// Bare `[...]` of products.
    Array,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn exists(&self, category: &str) -> bool;
    async fn save(&self, category: &str, file: &ResultFile) -> CrawlResult<PathBuf>;
    fn path_for(&self, category: &str) -> PathBuf;
}

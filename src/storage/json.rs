use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use super::{OutputShape, ResultStore};
use crate::error::CrawlResult;
use crate::models::ResultFile;

/// One pretty-printed JSON file per category under `dir`.
pub struct JsonFileStore {
    dir: PathBuf,
    shape: OutputShape,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>, shape: OutputShape) -> Self {
        Self {
            dir: dir.into(),
            shape,
        }
    }

    fn render(&self, file: &ResultFile) -> CrawlResult<String> {
        let json = match self.shape {
            OutputShape::Envelope => serde_json::to_string_pretty(file)?,
            OutputShape::Array => serde_json::to_string_pretty(file.products())?,
        };
        Ok(json)
    }
}

fn file_name(category: &str) -> String {
    let stem = category
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace(['/', '\\'], "_");
    format!("{}_products.json", stem)
}

#[async_trait]
impl ResultStore for JsonFileStore {
    async fn exists(&self, category: &str) -> bool {
        fs::try_exists(self.path_for(category))
            .await
            .unwrap_or(false)
    }

    async fn save(&self, category: &str, file: &ResultFile) -> CrawlResult<PathBuf> {
        let path = self.path_for(category);
        let body = self.render(file)?;

        fs::create_dir_all(&self.dir).await?;

        // Write beside the target and rename so readers never see half a file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;

        debug!("Wrote {} bytes to {}", fs::metadata(&path).await?.len(), path.display());
        info!(
            "Saved {} products for category {} to {}",
            file.total_products(),
            category,
            path.display()
        );
        Ok(path)
    }

    fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(file_name(category))
    }
}

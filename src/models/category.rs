use serde::{Deserialize, Serialize};
use tracing::warn;

/// A named search query whose results end up in one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTask {
    pub name: String,
    pub search_url: String,
}

impl CategoryTask {
    pub fn new(name: impl Into<String>, search_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            search_url: search_url.into(),
        }
    }

    /// Parse a flat list of `name url` lines.
    pub fn parse_list(text: &str) -> Vec<CategoryTask> {
        let mut tasks = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(name), Some(url)) => tasks.push(CategoryTask::new(name, url)),
                _ => warn!("Skipping malformed category line {}: {:?}", idx + 1, line),
            }
        }

        tasks
    }
}

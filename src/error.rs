use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("anti-bot page returned for {url}")]
    Blocked { url: String },

    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("unusable site rules: {0}")]
    Rules(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CrawlError::Status { status, .. } => {
                !matches!(*status, StatusCode::NOT_FOUND | StatusCode::GONE)
            }
            CrawlError::Selector(_) | CrawlError::Rules(_) => false,
            _ => true,
        }
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;

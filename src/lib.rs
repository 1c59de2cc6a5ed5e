//! Category crawler for e-commerce search listings.
//!
//! A search URL is paged through to collect item identifiers, each
//! identifier is resolved to a [`models::ProductRecord`] through its detail
//! page, and the records are written to one JSON file per category. Sites
//! are described by selector tables ([`sites::SiteRules`]) rather than code.

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod paginator;
pub mod parsers;
pub mod retry;
pub mod scheduler;
pub mod sites;
pub mod storage;
pub mod utils;

pub use crate::config::Config;
pub use crate::crawler::{CategoryOutcome, CrawlSettings, Crawler, FailurePolicy};
pub use crate::error::{CrawlError, CrawlResult};

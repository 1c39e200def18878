pub mod orchestrator;
pub mod refresh;
pub mod scraper;

use thiserror::Error;

pub use orchestrator::ScrapeOrchestrator;
pub use refresh::PriceRefresher;
pub use scraper::{HttpScraper, Scraper, ScraperError};

/// Outcome error of a scrape job. Cloneable because every caller attached to
/// the same in-flight job receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("{reason}")]
    Failed { reason: String },
    #[error("could not save scraped products: {0}")]
    Store(String),
}

impl ScrapeError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ScrapeError::Failed { reason: reason.into() }
    }
}

//! Client side of the external scraping service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ScraperConfig;
use crate::models::ScrapedProduct;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("scraper returned status {0}")]
    Status(u16),
    #[error("could not parse scraper response: {0}")]
    Parse(String),
}

/// Extracts the products listed at a URL.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<Vec<ScrapedProduct>, ScraperError>;
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    products: Vec<ScrapedProduct>,
}

/// Calls a scraping service over HTTP: `POST {endpoint}` with `{"url": ...}`,
/// answered by `{"products": [...]}`.
pub struct HttpScraper {
    client: Client,
    endpoint: String,
}

impl HttpScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| ScraperError::Network(e.to_string()))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<Vec<ScrapedProduct>, ScraperError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ScrapeRequest { url })
            .send()
            .await
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Status(status.as_u16()));
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| ScraperError::Parse(e.to_string()))?;
        Ok(body.products)
    }
}

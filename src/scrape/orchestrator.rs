//! Runs scrape jobs and writes their results to the product store.
//!
//! At most one job per URL is in flight. A submission for a URL that is
//! already being scraped attaches to the running job and receives the same
//! outcome. Jobs run as spawned tasks, so a job finishes and releases its
//! registry slot even when every submitter has gone away. A scraper that never
//! returns keeps its slot forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::db::models::Product;
use crate::db::repository::ProductRepository;
use crate::models::ScrapedProduct;
use crate::scrape::{ScrapeError, Scraper};

pub type ScrapeResult = Result<Arc<Vec<Product>>, ScrapeError>;

type InFlightJob = Shared<BoxFuture<'static, ScrapeResult>>;

#[derive(Clone)]
pub struct ScrapeOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    scraper: Arc<dyn Scraper>,
    repo: ProductRepository,
    in_flight: Mutex<HashMap<String, InFlightJob>>,
}

impl ScrapeOrchestrator {
    pub fn new(scraper: Arc<dyn Scraper>, repo: ProductRepository) -> Self {
        Self {
            inner: Arc::new(Inner {
                scraper,
                repo,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub async fn submit(&self, url: &str) -> ScrapeResult {
        let url = validate_url(url)?;
        self.join_or_start(url).await
    }

    pub fn is_in_flight(&self, url: &str) -> bool {
        self.inner.registry().contains_key(url)
    }

    fn join_or_start(&self, url: String) -> InFlightJob {
        let mut in_flight = self.inner.registry();
        if let Some(job) = in_flight.get(&url) {
            tracing::debug!(url = %url, "joining in-flight scrape");
            return job.clone();
        }

        let job_id = Uuid::new_v4();
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
            url: url.clone(),
        };
        let span = tracing::info_span!("scrape", %job_id, url = %url);
        let handle = tokio::spawn(
            async move {
                let guard = guard;
                guard.inner.run(&guard.url).await
            }
            .instrument(span),
        );

        let job = async move {
            handle.await.unwrap_or_else(|e| {
                tracing::error!(%job_id, error = %e, "scrape task aborted");
                Err(ScrapeError::failed(format!("scrape task aborted: {e}")))
            })
        }
        .boxed()
        .shared();

        // The task cannot clear its slot before this insert: clearing needs
        // the lock held here.
        in_flight.insert(url, job.clone());
        job
    }
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, HashMap<String, InFlightJob>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self, url: &str) -> ScrapeResult {
        tracing::info!("scrape started");

        let scraped = self.scraper.scrape(url).await.map_err(|e| {
            tracing::warn!(error = %e, "scraper failed");
            ScrapeError::failed(e.to_string())
        })?;

        let batch = sanitize(scraped);
        if batch.is_empty() {
            tracing::warn!("scraper returned no usable products");
            return Err(ScrapeError::failed("empty result"));
        }

        let repo = self.repo.clone();
        let stored = tokio::task::spawn_blocking(move || repo.upsert_all(&batch))
            .await
            .map_err(|e| ScrapeError::Store(e.to_string()))?
            .map_err(|e| {
                tracing::error!(error = %e, "saving scraped products failed");
                ScrapeError::Store(e.to_string())
            })?;

        tracing::info!(count = stored.len(), "scrape finished");
        Ok(Arc::new(stored))
    }
}

/// Releases the registry slot when the job task ends, including by panic.
struct InFlightGuard {
    inner: Arc<Inner>,
    url: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.registry().remove(&self.url);
    }
}

pub fn validate_url(raw: &str) -> Result<String, ScrapeError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ScrapeError::InvalidUrl("a URL is required".to_string()));
    }

    let parsed = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ScrapeError::InvalidUrl(format!("{url}: expected an http(s) URL")));
    }
    Ok(url.to_string())
}

/// Drops unusable products and collapses duplicate codes, keeping the last
/// occurrence at the position of the first.
fn sanitize(scraped: Vec<ScrapedProduct>) -> Vec<ScrapedProduct> {
    let mut batch: Vec<ScrapedProduct> = Vec::with_capacity(scraped.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for mut item in scraped {
        if !item.is_valid() {
            tracing::warn!(product_code = %item.product_code, title = %item.title, "skipping product with invalid data");
            continue;
        }
        item.product_code = item.product_code.trim().to_string();
        match positions.get(&item.product_code) {
            Some(&at) => batch[at] = item,
            None => {
                positions.insert(item.product_code.clone(), batch.len());
                batch.push(item);
            }
        }
    }
    batch
}

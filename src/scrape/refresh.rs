use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::db::repository::ProductRepository;
use crate::scrape::ScrapeOrchestrator;

/// Periodically re-scrapes every known product source URL so stored prices
/// (and their history) follow the shops.
#[derive(Clone)]
pub struct PriceRefresher {
    orchestrator: ScrapeOrchestrator,
    repo: ProductRepository,
    interval: Duration,
    max_workers: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl PriceRefresher {
    pub fn new(orchestrator: ScrapeOrchestrator, repo: ProductRepository, interval: Duration, max_workers: usize) -> Self {
        Self {
            orchestrator,
            repo,
            interval: interval.max(Duration::from_secs(1)),
            max_workers: max_workers.max(1),
        }
    }

    /// First pass runs immediately, then once per interval.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            let summary = self.refresh_once().await;
            tracing::info!(
                attempted = summary.attempted,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "price refresh completed"
            );
        }
    }

    pub async fn refresh_once(&self) -> RefreshSummary {
        let repo = self.repo.clone();
        let urls = match tokio::task::spawn_blocking(move || repo.source_urls()).await {
            Ok(Ok(urls)) => urls,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "could not load product urls for refresh");
                return RefreshSummary::default();
            }
            Err(e) => {
                tracing::error!(error = %e, "refresh lookup task failed");
                return RefreshSummary::default();
            }
        };

        stream::iter(urls)
            .map(|url| async move {
                let outcome = self.orchestrator.submit(&url).await;
                if let Err(e) = &outcome {
                    tracing::warn!(url = %url, error = %e, "price refresh failed");
                }
                outcome.is_ok()
            })
            .buffer_unordered(self.max_workers)
            .fold(RefreshSummary::default(), |mut summary, ok| async move {
                summary.attempted += 1;
                if ok {
                    summary.succeeded += 1;
                } else {
                    summary.failed += 1;
                }
                summary
            })
            .await
    }
}

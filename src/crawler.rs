//!
//! src/crawler.rs
//!
//! Refresh pipeline over the track store: decides per record whether
//! a fetch is warranted, runs fetches sequentially and isolates
//! per-record failures
//!

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::errors::ScrapeError;
use crate::store::TrackStore;
use crate::types::{TrackAttrs, TrackUrl};

/// Anything that can resolve a track page into its attributes.
#[async_trait]
pub trait TrackFetcher {
    async fn fetch(&self, url: &TrackUrl) -> Result<TrackAttrs, ScrapeError>;
}

/// A fetch that failed, kept for the end-of-run report.
#[derive(Debug)]
pub struct FetchFailure {
    pub url: TrackUrl,
    pub error: ScrapeError
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub skipped: usize,
    pub failures: Vec<FetchFailure>
}

pub struct Crawler<F> {
    fetcher: F,
    force_update: bool
}

impl<F: TrackFetcher> Crawler<F> {
    pub fn new(fetcher: F, force_update: bool) -> Self {
        Self { fetcher, force_update }
    }

    /// One sequential pass over the store. Records that are already
    /// complete are skipped unless force_update is set. A failed fetch
    /// leaves its record untouched and never stops the batch.
    pub async fn run(&self, store: &mut TrackStore) -> RunReport {
        let mut report = RunReport::default();

        for url in store.urls() {
            let complete = store.get(&url).is_some_and(|t| t.is_complete());
            if !self.force_update && complete {
                debug!(url = %url, "crawl.skip");
                report.skipped += 1;
                continue;
            }

            match self.fetcher.fetch(&url).await {
                Ok(attrs) => {
                    if let Some(track) = store.get_mut(&url) {
                        track.apply(attrs);
                    }
                    debug!(url = %url, "crawl.ok");
                    report.fetched += 1;
                }
                Err(error) => {
                    warn!(url = %url, error = %error, "crawl.fail");
                    report.failures.push(FetchFailure { url, error });
                }
            }
        }

        info!(
            fetched = report.fetched,
            skipped = report.skipped,
            failed = report.failures.len(),
            "crawl.done"
        );
        report
    }
}

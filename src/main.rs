//!
//! src/main.rs
//!
//! CLI entry: load the saved table, ingest the url list, crawl what
//! is missing, prune incomplete rows and save the table back
//!

mod config;
mod crawler;
mod errors;
mod fetch;
mod logging;
mod persistent;
mod store;
mod types;

use std::fs;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::crawler::{Crawler, RunReport, TrackFetcher};
use crate::errors::ScrapeError;
use crate::fetch::HttpFetcher;
use crate::store::TrackStore;

#[tokio::main]
async fn main() -> Result<(), ScrapeError> {
    let cfg = config::load_config()?;
    let _logger = logging::init_logging(&cfg.logging)?;

    info!(
        version = %env!("CARGO_PKG_VERSION"),
        input = %cfg.in_file.display(),
        output = %cfg.out_file.display(),
        update = cfg.force_update,
        "starting"
    );

    let fetcher = HttpFetcher::new(&cfg.http)?;
    let (validation_errors, report) = run_batch(&cfg, fetcher).await?;

    report_soft_errors(&validation_errors, &report);
    Ok(())
}

/// One batch: load the saved table, ingest the url list, crawl what
/// is missing, prune and save. Returns the soft errors for the
/// end-of-run report.
async fn run_batch<F: TrackFetcher>(cfg: &AppConfig, fetcher: F) ->
    Result<(Vec<ScrapeError>, RunReport), ScrapeError> {

    // An unreadable url list is fatal; a missing output table is not.
    let input = fs::read_to_string(&cfg.in_file)?;
    if store::list_is_empty(&input) {
        info!("url list is empty, leaving the table untouched");
        return Ok((Vec::new(), RunReport::default()));
    }

    let mut store = TrackStore::new();
    store.load(persistent::load_tracks(&cfg.out_file)?);
    let validation_errors = store.ingest(input.lines());

    let report = Crawler::new(fetcher, cfg.force_update).run(&mut store).await;

    store.prune_incomplete();
    persistent::save_tracks(&cfg.out_file, store.tracks())?;
    info!(tracks = store.len(), path = %cfg.out_file.display(), "table saved");

    Ok((validation_errors, report))
}

/// Aggregate end-of-run report. Soft failures never change the exit
/// status; their records are simply dropped or left stale.
fn report_soft_errors(validation: &[ScrapeError], report: &RunReport) {
    for error in validation {
        warn!(error = %error, "invalid input line");
    }
    for failure in &report.failures {
        warn!(url = %failure.url, error = %failure.error, "fetch failed");
    }
    if !validation.is_empty() || !report.failures.is_empty() {
        warn!(
            invalid = validation.len(),
            failed = report.failures.len(),
            "completed with errors"
        );
    }
}

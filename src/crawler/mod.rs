//! Crawl orchestration
//!
//! This module contains the two orchestration stages and their fetch
//! collaborator:
//! - Listing phase: paginated traversal producing record summaries
//! - Enrichment phase: per-record detail fetches filling sentinel fields
//! - Page fetching with per-attempt session contexts

pub mod controller;
mod enrichment;
mod fetcher;

pub use controller::{page_url, CrawlController, ListingReport, RunOutcome};
pub use enrichment::{EnrichmentDriver, EnrichmentReport};
pub use fetcher::{FetchOutcome, HttpFetcher, PageFetcher};

use crate::config::Config;
use crate::extract::{CssExtractor, Extractor, SelectorSet};
use crate::HarvestError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Combined result of a full harvest (listing plus enrichment)
#[derive(Debug)]
pub struct HarvestSummary {
    pub listing: ListingReport,
    /// Absent when the listing phase did not finish cleanly
    pub enrichment: Option<EnrichmentReport>,
}

/// Runs a complete harvest: the listing phase, then — if the catalog was
/// traversed cleanly — the enrichment phase over the same sink
///
/// This is the main library entry point; it wires up the shipped HTTP
/// fetcher and CSS extractor. Callers wanting different collaborators
/// construct [`CrawlController`] and [`EnrichmentDriver`] directly.
pub async fn harvest(
    config: Config,
    cancel: CancellationToken,
) -> Result<HarvestSummary, HarvestError> {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.fetcher.clone()));
    let extractor: Arc<dyn Extractor> = Arc::new(CssExtractor::new(SelectorSet::default()));

    let mut controller = CrawlController::new(
        config.clone(),
        Arc::clone(&fetcher),
        Arc::clone(&extractor),
        cancel.clone(),
    );
    let listing = controller.run().await?;

    let enrichment = if listing.outcome.is_clean() {
        let mut driver = EnrichmentDriver::new(config, fetcher, extractor, cancel);
        Some(driver.run().await?)
    } else {
        tracing::warn!(
            "Skipping enrichment after listing outcome {:?}",
            listing.outcome
        );
        None
    };

    Ok(HarvestSummary {
        listing,
        enrichment,
    })
}

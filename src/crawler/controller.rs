//! Listing-phase crawl controller
//!
//! Owns the page loop: fetch with a fresh session, classify health, extract
//! summaries item by item, persist each record immediately, advance the
//! checkpoint, pace, then move on or terminate. Termination is absorbing;
//! an external supervisor restarts the whole controller and it resumes from
//! the checkpoint.

use crate::checkpoint::CheckpointStore;
use crate::config::{BlockPolicy, Config};
use crate::crawler::fetcher::{FetchOutcome, PageFetcher};
use crate::extract::Extractor;
use crate::health::{HealthMonitor, PageHealth};
use crate::pacing::{sample_ms, Pacer};
use crate::sink::{CsvSink, JobRecord, RecordSink};
use crate::HarvestError;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Base backoff between transient fetch retries; scales with the attempt
const FETCH_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Why a run stopped
///
/// Absorbing: once a run terminates, the controller never restarts itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The catalog advertised no further page
    Completed,

    /// An empty page after a redirect to an earlier page index
    EndOfCatalog,

    /// An empty page without redirect evidence
    NoRecords,

    /// A block signal terminated the run
    Blocked,

    /// Transient fetch retries were exhausted
    FetchFailed,

    /// External cancellation was observed
    Cancelled,
}

impl RunOutcome {
    /// True when the catalog was traversed as far as it goes
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Completed | Self::EndOfCatalog | Self::NoRecords)
    }
}

/// Result of a listing run
#[derive(Debug)]
pub struct ListingReport {
    pub outcome: RunOutcome,
    /// Pages for which the checkpoint advanced during this run
    pub pages_completed: u32,
    /// Records appended to the sink during this run
    pub records_persisted: usize,
}

/// Outcome of fetching one page, transient retries already spent
enum FetchedPage {
    Ok { final_url: String, body: String },
    Denied,
    Exhausted,
    Cancelled,
}

/// What to do after one page attempt
enum PageStep {
    /// Page processed; the body is kept for the next-page affordance probe
    Advance { body: String },
    /// Re-attempt the same page (block-policy cooldown already applied)
    Again,
    Terminate(RunOutcome),
}

/// Listing-phase orchestrator
pub struct CrawlController {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
    monitor: HealthMonitor,
    pacer: Pacer,
    checkpoint: CheckpointStore,
    sink: Arc<Mutex<CsvSink>>,
    cancel: CancellationToken,
    records_persisted: usize,
    pages_completed: u32,
}

impl CrawlController {
    /// Creates a controller wired to the given collaborators
    ///
    /// Sink, checkpoint, monitor, and pacer are built from the configuration;
    /// fetcher and extractor are injected so tests can substitute them.
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
        cancel: CancellationToken,
    ) -> Self {
        let monitor = HealthMonitor::new(&config.health);
        let pacer = Pacer::new(config.pacing.clone());
        let checkpoint = CheckpointStore::new(&config.output.checkpoint_path);
        let sink = Arc::new(Mutex::new(CsvSink::new(&config.output.store_path)));

        Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            monitor,
            pacer,
            checkpoint,
            sink,
            cancel,
            records_persisted: 0,
            pages_completed: 0,
        }
    }

    /// Runs the listing phase to termination
    pub async fn run(&mut self) -> Result<ListingReport, HarvestError> {
        let mut page = self.checkpoint.resume_page(self.config.catalog.start_page);
        tracing::info!("Listing run starting at page {}", page);

        let outcome = 'run: loop {
            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }

            // Re-attempts of the same page under the retry block policy
            let mut block_attempts = 0u32;
            let body = loop {
                match self.attempt_page(page, &mut block_attempts).await? {
                    PageStep::Advance { body } => break body,
                    PageStep::Again => continue,
                    PageStep::Terminate(outcome) => break 'run outcome,
                }
            };

            // Inter-page pacing, plus the periodic long break
            if self.pause(self.pacer.page_delay()).await {
                break RunOutcome::Cancelled;
            }
            if let Some(long) = self.pacer.long_break(page) {
                tracing::info!("Long break after page {}: {:?}", page, long);
                if self.pause(long).await {
                    break RunOutcome::Cancelled;
                }
            }

            if !self.extractor.has_next_page(&body) {
                tracing::info!("No next-page affordance after page {}; done", page);
                break RunOutcome::Completed;
            }
            page += 1;
        };

        tracing::info!(
            "Listing run terminated: {:?} ({} pages completed, {} records)",
            outcome,
            self.pages_completed,
            self.records_persisted
        );

        Ok(ListingReport {
            outcome,
            pages_completed: self.pages_completed,
            records_persisted: self.records_persisted,
        })
    }

    /// One attempt at one listing page: fetch, classify, extract, persist,
    /// advance the checkpoint
    async fn attempt_page(
        &mut self,
        page: u32,
        block_attempts: &mut u32,
    ) -> Result<PageStep, HarvestError> {
        let url = page_url(&self.config.catalog.page_template, page);
        tracing::info!("Requesting listing page {} -> {}", page, url);

        let (final_url, body) = match self.fetch_with_retries(&url).await {
            FetchedPage::Ok { final_url, body } => (final_url, body),
            FetchedPage::Denied => {
                tracing::warn!("Transport denial on page {}", page);
                return self.on_block(page, block_attempts).await;
            }
            FetchedPage::Exhausted => {
                return Ok(PageStep::Terminate(RunOutcome::FetchFailed));
            }
            FetchedPage::Cancelled => {
                return Ok(PageStep::Terminate(RunOutcome::Cancelled));
            }
        };

        match self.monitor.classify(&body) {
            PageHealth::Blocked { marker } => {
                tracing::warn!("Block signal '{}' on page {}", marker, page);
                self.on_block(page, block_attempts).await
            }
            PageHealth::Empty => {
                if redirected_to_earlier_page(&final_url, page) {
                    tracing::info!(
                        "Page {} redirected to {}; end of catalog",
                        page,
                        final_url
                    );
                    Ok(PageStep::Terminate(RunOutcome::EndOfCatalog))
                } else {
                    tracing::warn!("No records on page {} and no redirect evidence", page);
                    Ok(PageStep::Terminate(RunOutcome::NoRecords))
                }
            }
            PageHealth::Healthy => {
                let persisted = self.extract_and_persist(page, &final_url, &body).await?;

                // Once cancellation is observed, no checkpoint write may
                // follow; the interrupted page is retried on the next run.
                if self.cancel.is_cancelled() {
                    return Ok(PageStep::Terminate(RunOutcome::Cancelled));
                }

                if persisted > 0 {
                    // Happens-after all persistence for this page
                    self.checkpoint
                        .save(page)
                        .map_err(HarvestError::Checkpoint)?;
                    self.pages_completed += 1;
                } else {
                    // Ambiguous page: containers matched but nothing was
                    // persisted. Leave the checkpoint so the next run
                    // retries it.
                    tracing::warn!(
                        "Page {} was healthy but persisted zero records; checkpoint not advanced",
                        page
                    );
                }

                Ok(PageStep::Advance { body })
            }
        }
    }

    /// Extracts summaries and appends each record immediately
    ///
    /// Item failures are absorbed here: one bad item is logged and skipped,
    /// the rest of the page persists. Sink failures are fatal.
    async fn extract_and_persist(
        &mut self,
        page: u32,
        final_url: &str,
        body: &str,
    ) -> Result<usize, HarvestError> {
        let base_url = match Url::parse(final_url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!("Unparseable final URL '{}': {}", final_url, e);
                return Ok(0);
            }
        };

        let items = self.extractor.listing(body, &base_url);
        let total = items.len();
        tracing::info!("Found {} record containers on page {}", total, page);

        let mut persisted = 0usize;
        for (index, item) in items.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }

            let summary = match item {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!("Skipping item {}/{} on page {}: {}", index + 1, total, page, e);
                    continue;
                }
            };

            let record = JobRecord::from_listing(
                summary.title,
                summary.organization,
                summary.posted,
                summary.source_link,
                Utc::now(),
            );

            {
                let mut sink = self.sink.lock().unwrap();
                sink.append(&record)?;
            }
            persisted += 1;
            self.records_persisted += 1;
            tracing::info!(
                "Page {} item {}/{} persisted: {}",
                page,
                index + 1,
                total,
                record.title
            );

            if index + 1 < total && self.pause(self.pacer.record_delay()).await {
                break;
            }
        }

        Ok(persisted)
    }

    /// Applies the configured block policy for the current page
    async fn on_block(&self, page: u32, block_attempts: &mut u32) -> Result<PageStep, HarvestError> {
        match self.config.catalog.on_block {
            BlockPolicy::Stop => Ok(PageStep::Terminate(RunOutcome::Blocked)),
            BlockPolicy::Retry => {
                *block_attempts += 1;
                if *block_attempts > self.config.catalog.block_retry_limit {
                    tracing::warn!(
                        "Block retry limit reached on page {}; terminating",
                        page
                    );
                    return Ok(PageStep::Terminate(RunOutcome::Blocked));
                }

                let cooldown = sample_ms(self.config.catalog.block_cooldown_ms);
                tracing::info!(
                    "Cooling down {:?} before re-attempting page {} ({}/{})",
                    cooldown,
                    page,
                    block_attempts,
                    self.config.catalog.block_retry_limit
                );
                if self.pause(cooldown).await {
                    return Ok(PageStep::Terminate(RunOutcome::Cancelled));
                }
                Ok(PageStep::Again)
            }
        }
    }

    /// Fetches a listing page, retrying transient failures up to the
    /// configured bound with a growing backoff
    async fn fetch_with_retries(&self, url: &str) -> FetchedPage {
        let max = self.config.catalog.max_fetch_retries;
        for attempt in 1..=max {
            if self.cancel.is_cancelled() {
                return FetchedPage::Cancelled;
            }

            match self.fetcher.fetch(url).await {
                FetchOutcome::Success {
                    final_url,
                    status_code,
                    body,
                } => {
                    tracing::debug!("Fetched {} (HTTP {})", final_url, status_code);
                    return FetchedPage::Ok { final_url, body };
                }
                FetchOutcome::Denied { reason } => {
                    tracing::warn!("Denied fetching {}: {}", url, reason);
                    return FetchedPage::Denied;
                }
                FetchOutcome::TransientFailure { reason } => {
                    tracing::warn!(
                        "Fetch attempt {}/{} for {} failed: {}",
                        attempt,
                        max,
                        url,
                        reason
                    );
                    if attempt < max && self.pause(FETCH_RETRY_BACKOFF * attempt).await {
                        return FetchedPage::Cancelled;
                    }
                }
            }
        }
        FetchedPage::Exhausted
    }

    /// Sleeps unless cancelled first; returns true when cancellation was
    /// observed
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

/// Substitutes the page number into the listing URL template
pub fn page_url(template: &str, page: u32) -> String {
    template.replace("{page}", &page.to_string())
}

/// Whether the final URL of a fetch is evidence that the server bounced the
/// request back to an earlier page index
///
/// Catalogs that run out of pages redirect to the first (or an earlier)
/// page; an empty body plus this evidence means "end of catalog" rather
/// than "no records".
pub fn redirected_to_earlier_page(final_url: &str, requested: u32) -> bool {
    let parsed = match Url::parse(final_url) {
        Ok(u) => u,
        Err(_) => return false,
    };

    for (key, value) in parsed.query_pairs() {
        if key == "page" {
            return match value.parse::<u32>() {
                Ok(n) => n < requested,
                Err(_) => false,
            };
        }
    }

    // The page parameter vanished entirely: a bounce to the bare first page
    requested > 1
}

//! Enrichment driver
//!
//! Second orchestration stage: walk the sink for records whose detail
//! fields are all still sentinel, follow each source link, and merge the
//! extracted patch back in. The pending set is re-derived by scanning the
//! sink, so this phase carries no checkpoint of its own: a record is at its
//! fixed point once any non-sentinel detail field is observed, and a
//! skipped record is simply pending again on the next run.

use crate::config::{BlockPolicy, Config};
use crate::crawler::controller::RunOutcome;
use crate::crawler::fetcher::{FetchOutcome, PageFetcher};
use crate::extract::Extractor;
use crate::health::{HealthMonitor, PageHealth};
use crate::pacing::{sample_ms, Pacer};
use crate::sink::{CsvSink, RecordSink};
use crate::HarvestError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of an enrichment run
#[derive(Debug)]
pub struct EnrichmentReport {
    pub outcome: RunOutcome,
    /// Records whose detail fields were merged this run
    pub enriched: usize,
    /// Records skipped this run (fetch or extraction failure); they stay
    /// sentinel and are retried by a future run
    pub skipped: usize,
}

/// Detail-phase orchestrator
pub struct EnrichmentDriver {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
    monitor: HealthMonitor,
    pacer: Pacer,
    sink: Arc<Mutex<CsvSink>>,
    cancel: CancellationToken,
}

impl EnrichmentDriver {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
        cancel: CancellationToken,
    ) -> Self {
        let monitor = HealthMonitor::new(&config.health);
        let pacer = Pacer::new(config.pacing.clone());
        let sink = Arc::new(Mutex::new(CsvSink::new(&config.output.store_path)));

        Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            monitor,
            pacer,
            sink,
            cancel,
        }
    }

    /// Runs the enrichment phase over the current pending set
    pub async fn run(&mut self) -> Result<EnrichmentReport, HarvestError> {
        let pending: Vec<_> = {
            let sink = self.sink.lock().unwrap();
            sink.scan()?
                .into_iter()
                .filter(|r| r.needs_enrichment())
                .collect()
        };

        let total = pending.len();
        tracing::info!("{} records pending enrichment", total);

        let mut enriched = 0usize;
        let mut skipped = 0usize;
        let mut outcome = RunOutcome::Completed;

        for (index, record) in pending.iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome = RunOutcome::Cancelled;
                break;
            }

            tracing::info!(
                "Enriching {}/{}: {}",
                index + 1,
                total,
                record.source_link
            );

            match self.enrich_one(&record.source_link).await? {
                EnrichStep::Merged => enriched += 1,
                EnrichStep::Skipped => skipped += 1,
                EnrichStep::Terminate(o) => {
                    outcome = o;
                    break;
                }
            }

            if index + 1 < total && self.pause(self.pacer.record_delay()).await {
                outcome = RunOutcome::Cancelled;
                break;
            }
        }

        tracing::info!(
            "Enrichment run terminated: {:?} ({} enriched, {} skipped)",
            outcome,
            enriched,
            skipped
        );

        Ok(EnrichmentReport {
            outcome,
            enriched,
            skipped,
        })
    }

    /// Fetches one detail page and merges its patch
    async fn enrich_one(&self, source_link: &str) -> Result<EnrichStep, HarvestError> {
        let body = match self.fetcher.fetch(source_link).await {
            FetchOutcome::Success { body, .. } => body,
            FetchOutcome::TransientFailure { reason } => {
                tracing::warn!("Detail fetch failed for {}: {}", source_link, reason);
                return Ok(EnrichStep::Skipped);
            }
            FetchOutcome::Denied { reason } => {
                tracing::warn!("Detail fetch denied for {}: {}", source_link, reason);
                return Ok(EnrichStep::Skipped);
            }
        };

        // Detail pages never contain record containers, so only the block
        // arm of the classification is meaningful here.
        if let PageHealth::Blocked { marker } = self.monitor.classify(&body) {
            tracing::warn!("Block signal '{}' on detail page {}", marker, source_link);
            return match self.config.catalog.on_block {
                BlockPolicy::Stop => Ok(EnrichStep::Terminate(RunOutcome::Blocked)),
                BlockPolicy::Retry => {
                    let cooldown = sample_ms(self.config.catalog.block_cooldown_ms);
                    tracing::info!("Cooling down {:?}, then skipping this record", cooldown);
                    if self.pause(cooldown).await {
                        return Ok(EnrichStep::Terminate(RunOutcome::Cancelled));
                    }
                    Ok(EnrichStep::Skipped)
                }
            };
        }

        let patch = match self.extractor.detail(&body) {
            Ok(patch) => patch,
            Err(e) => {
                tracing::warn!("Detail extraction failed for {}: {}", source_link, e);
                return Ok(EnrichStep::Skipped);
            }
        };

        if patch.is_empty() {
            tracing::warn!("Detail page {} yielded no fields", source_link);
            return Ok(EnrichStep::Skipped);
        }

        {
            let mut sink = self.sink.lock().unwrap();
            sink.update_by_key(source_link, &patch)?;
        }
        Ok(EnrichStep::Merged)
    }

    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

enum EnrichStep {
    Merged,
    Skipped,
    Terminate(RunOutcome),
}

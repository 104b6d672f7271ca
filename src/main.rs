//! Ukiyo-Harvest main entry point
//!
//! Command-line interface for the catalog harvester. Outcomes map to
//! distinct exit codes so a supervisor can tell a finished catalog from a
//! blocked or failed run.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use ukiyo_harvest::checkpoint::CheckpointStore;
use ukiyo_harvest::config::{load_config_with_hash, Config};
use ukiyo_harvest::crawler::{self, CrawlController, EnrichmentDriver, RunOutcome};
use ukiyo_harvest::extract::{CssExtractor, Extractor, SelectorSet};
use ukiyo_harvest::sink::{CsvSink, RecordSink};
use ukiyo_harvest::{HttpFetcher, PageFetcher};

/// Ukiyo-Harvest: a resumable catalog harvester
///
/// Walks a paginated catalog page by page, persists each record as it is
/// extracted, and fills in detail fields in a second pass. Interrupted runs
/// resume from the last fully persisted page.
#[derive(Parser, Debug)]
#[command(name = "ukiyo-harvest")]
#[command(version = "0.3.0")]
#[command(about = "A resumable catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run only the listing phase
    #[arg(long, conflicts_with = "enrich_only")]
    listing_only: bool,

    /// Run only the enrichment phase over the existing store
    #[arg(long, conflicts_with = "listing_only")]
    enrich_only: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show store and checkpoint statistics and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return ExitCode::SUCCESS;
    }

    if cli.stats {
        return match handle_stats(&config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("Failed to read statistics: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    // Ctrl-C cancels at the next suspension point
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received; stopping at the next safe point");
            signal_token.cancel();
        }
    });

    handle_harvest(config, &cli, cancel).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ukiyo_harvest=info,warn"),
            1 => EnvFilter::new("ukiyo_harvest=debug,info"),
            2 => EnvFilter::new("ukiyo_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the plan
fn handle_dry_run(config: &Config) {
    println!("=== Ukiyo-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  Page template: {}", config.catalog.page_template);
    println!("  Start page: {}", config.catalog.start_page);
    println!("  Max fetch retries: {}", config.catalog.max_fetch_retries);
    println!("  On block: {:?}", config.catalog.on_block);

    println!("\nPacing:");
    println!(
        "  Record delay: {}-{}ms",
        config.pacing.record_delay_ms[0], config.pacing.record_delay_ms[1]
    );
    println!(
        "  Page delay: {}-{}ms",
        config.pacing.page_delay_ms[0], config.pacing.page_delay_ms[1]
    );
    println!(
        "  Long break: every {} pages, {}-{}ms",
        config.pacing.long_break_every,
        config.pacing.long_break_ms[0],
        config.pacing.long_break_ms[1]
    );

    println!("\nHealth:");
    println!("  Record container: {}", config.health.record_container);
    println!("  Block markers ({}):", config.health.block_markers.len());
    for marker in &config.health.block_markers {
        println!("    - {}", marker);
    }

    println!("\nFetcher:");
    println!("  User agents: {}", config.fetcher.user_agents.len());
    println!(
        "  Proxy: {}",
        config.fetcher.proxy.as_deref().unwrap_or("none")
    );
    println!("  Request timeout: {}ms", config.fetcher.request_timeout_ms);

    println!("\nOutput:");
    println!("  Record store: {}", config.output.store_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    let checkpoint = CheckpointStore::new(&config.output.checkpoint_path);
    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would resume at page {}",
        checkpoint.resume_page(config.catalog.start_page)
    );
}

/// Handles the --stats mode: shows store and checkpoint statistics
fn handle_stats(config: &Config) -> ukiyo_harvest::Result<()> {
    let sink = CsvSink::new(&config.output.store_path);
    let records = sink.scan()?;
    let pending = records.iter().filter(|r| r.needs_enrichment()).count();

    let checkpoint = CheckpointStore::new(&config.output.checkpoint_path);

    println!("Record store: {}", config.output.store_path);
    println!("  Records: {}", records.len());
    println!("  Enriched: {}", records.len() - pending);
    println!("  Pending enrichment: {}", pending);
    println!("Checkpoint: {}", config.output.checkpoint_path);
    println!("  Last completed page: {}", checkpoint.load());

    Ok(())
}

/// Runs the requested phases and maps the outcome to an exit code
async fn handle_harvest(config: Config, cli: &Cli, cancel: CancellationToken) -> ExitCode {
    if cli.enrich_only {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.fetcher.clone()));
        let extractor: Arc<dyn Extractor> = Arc::new(CssExtractor::new(SelectorSet::default()));
        let mut driver = EnrichmentDriver::new(config, fetcher, extractor, cancel);
        return match driver.run().await {
            Ok(report) => {
                tracing::info!(
                    "Enrichment finished: {} enriched, {} skipped",
                    report.enriched,
                    report.skipped
                );
                exit_code(report.outcome)
            }
            Err(e) => {
                tracing::error!("Enrichment failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    if cli.listing_only {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.fetcher.clone()));
        let extractor: Arc<dyn Extractor> = Arc::new(CssExtractor::new(SelectorSet::default()));
        let mut controller = CrawlController::new(config, fetcher, extractor, cancel);
        return match controller.run().await {
            Ok(report) => {
                tracing::info!(
                    "Listing finished: {} pages, {} records",
                    report.pages_completed,
                    report.records_persisted
                );
                exit_code(report.outcome)
            }
            Err(e) => {
                tracing::error!("Listing run failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match crawler::harvest(config, cancel).await {
        Ok(summary) => {
            tracing::info!(
                "Harvest finished: listing {:?}, {} records",
                summary.listing.outcome,
                summary.listing.records_persisted
            );
            // Enrichment only runs after a clean listing phase, so its
            // outcome decides the exit status when present
            match summary.enrichment {
                Some(report) => exit_code(report.outcome),
                None => exit_code(summary.listing.outcome),
            }
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Maps a run outcome onto a process exit code
///
/// A finished catalog (including the empty tail) is success; a block, a
/// fetch failure, and cancellation are each distinguishable.
fn exit_code(outcome: RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Completed | RunOutcome::EndOfCatalog | RunOutcome::NoRecords => {
            ExitCode::SUCCESS
        }
        RunOutcome::Blocked => ExitCode::from(2),
        RunOutcome::FetchFailed => ExitCode::from(3),
        RunOutcome::Cancelled => ExitCode::from(130),
    }
}

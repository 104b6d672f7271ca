//! Ukiyo-Harvest: a resumable catalog harvester
//!
//! This crate implements a two-phase harvester for paginated web catalogs:
//! a listing pass that persists record summaries page by page, and an
//! enrichment pass that follows each record's source link to fill in detail
//! fields. Progress is checkpointed after every durably persisted page, so
//! an interrupted run resumes where it left off.

pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod health;
pub mod pacing;
pub mod sink;

use thiserror::Error;

/// Main error type for harvest operations
///
/// Everything here is fatal to the run in progress: transient fetch
/// failures, block signals, and per-item extraction failures are handled
/// inside the controllers and never surface as errors.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Record store error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Checkpoint write failed: {0}")]
    Checkpoint(std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    harvest, CrawlController, EnrichmentDriver, EnrichmentReport, HarvestSummary, HttpFetcher,
    ListingReport, PageFetcher, RunOutcome,
};
pub use extract::{CssExtractor, Extractor, SelectorSet};
pub use health::{HealthMonitor, PageHealth};
pub use sink::{CsvSink, JobRecord, RecordSink};

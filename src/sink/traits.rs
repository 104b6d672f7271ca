//! Record sink trait and error types

use crate::sink::record::{DetailPatch, JobRecord};
use thiserror::Error;

/// Errors that can occur during sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No record with source link '{0}'")]
    KeyNotFound(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Trait for durable record store implementations
///
/// The sink enforces no uniqueness: appending a key twice is acceptable,
/// and deduplication is the caller's policy. Callers serialize concurrent
/// writers around the sink (`Mutex`); implementations need not be
/// internally synchronized.
pub trait RecordSink {
    /// Durably appends a record; the row is flushed before returning
    fn append(&mut self, record: &JobRecord) -> SinkResult<()>;

    /// Durably merges a partial patch into every record whose source link
    /// equals `key`
    ///
    /// Only fields present in the patch overwrite; absent fields keep their
    /// prior values. An unknown key is an error.
    fn update_by_key(&mut self, key: &str, patch: &DetailPatch) -> SinkResult<()>;

    /// Ordered snapshot of all records; empty when the store does not exist
    ///
    /// The order is stable across calls within a run and across runs.
    fn scan(&self) -> SinkResult<Vec<JobRecord>>;
}

//! Durable record store
//!
//! This module contains the record types and the append-only CSV sink:
//! - One row per catalog record, fixed column set, header written once
//! - Immediate per-record flushes so a crash loses at most the in-flight row
//! - In-place field updates keyed by source link for the enrichment phase

mod csv_store;
mod record;
mod traits;

pub use csv_store::CsvSink;
pub use record::{derive_id, DetailPatch, JobRecord, UNSPECIFIED};
pub use traits::{RecordSink, SinkError, SinkResult};

//! CSV record store
//!
//! One row per record, fixed column set, UTF-8 throughout. The header is
//! written exactly once: on the first append into a new or empty file.
//! Later runs open in append mode, so restarts never truncate prior rows or
//! repeat the header. Updates rewrite the whole file through a sibling temp
//! file and an atomic rename, mirroring the checkpoint's durability rule.

use crate::sink::record::{DetailPatch, JobRecord};
use crate::sink::traits::{RecordSink, SinkError, SinkResult};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// CSV-backed record sink
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Creates a sink backed by the given file path
    ///
    /// The file is not touched until the first append.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Number of records currently in the store
    pub fn len(&self) -> SinkResult<usize> {
        Ok(self.scan()?.len())
    }

    fn header_needed(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        }
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &JobRecord) -> SinkResult<()> {
        let write_header = self.header_needed();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    fn update_by_key(&mut self, key: &str, patch: &DetailPatch) -> SinkResult<()> {
        let mut records = self.scan()?;

        let mut matched = false;
        for record in &mut records {
            if record.source_link == key {
                record.apply(patch);
                matched = true;
            }
        }
        if !matched {
            return Err(SinkError::KeyNotFound(key.to_string()));
        }

        let tmp = self.path.with_extension("rewrite");
        {
            let mut writer = WriterBuilder::new().from_path(&tmp)?;
            for record in &records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn scan(&self) -> SinkResult<Vec<JobRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new().from_path(&self.path)?;
        let mut records = Vec::new();
        for result in reader.deserialize() {
            records.push(result?);
        }
        Ok(records)
    }
}

//! Durable crawl checkpoint
//!
//! The checkpoint records the last listing page for which at least one
//! record was durably persisted. A following run resumes at
//! `max(configured start page, checkpoint + 1)`.
//!
//! `load` is deliberately infallible: an absent, unreadable, or corrupt
//! checkpoint means "start from zero". `save` writes a sibling temp file and
//! renames it over the target so an interrupted write can never destroy the
//! previous valid marker.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk checkpoint payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CheckpointFile {
    last_completed_page: u32,
}

/// Durable last-completed-page marker
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store backed by the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reads the last completed page, or 0 when no valid checkpoint exists
    pub fn load(&self) -> u32 {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read checkpoint {}: {}", self.path.display(), e);
                }
                return 0;
            }
        };

        match serde_json::from_str::<CheckpointFile>(&content) {
            Ok(file) => file.last_completed_page,
            Err(e) => {
                tracing::warn!(
                    "Corrupt checkpoint {} ({}); starting from zero",
                    self.path.display(),
                    e
                );
                0
            }
        }
    }

    /// Durably records `page` as the last completed page
    ///
    /// Write-then-rename keeps the previous marker intact if the process
    /// dies mid-write. Saving the same value twice is a no-op on the
    /// observable state.
    pub fn save(&self, page: u32) -> std::io::Result<()> {
        let payload = serde_json::to_string(&CheckpointFile {
            last_completed_page: page,
        })
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, payload)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!("Checkpoint advanced to page {}", page);
        Ok(())
    }

    /// Computes the page a run should resume from
    pub fn resume_page(&self, configured_start: u32) -> u32 {
        let last_completed = self.load();
        configured_start.max(last_completed + 1).max(1)
    }
}

//! Content health classification
//!
//! A fetched listing body is classified before any extraction runs. The
//! three-way split matters: `Blocked` must never be mistaken for "no more
//! results", and an empty page must never be treated as a block. The crawl
//! controller terminates, retries, or proceeds based solely on this
//! classification, never on raw markup.

use crate::config::HealthConfig;
use scraper::{Html, Selector};

/// Classification of a fetched page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageHealth {
    /// Record containers are present; extraction can proceed
    Healthy,

    /// No record containers and no block signal; end of data or layout miss
    Empty,

    /// A configured block-signal marker was found in the content
    Blocked {
        /// The marker that matched
        marker: String,
    },
}

/// Classifies page content against configured block markers and the
/// record-container selector
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    /// Markers held lowercased; matching is case-insensitive
    markers: Vec<String>,
    record_container: String,
}

impl HealthMonitor {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            markers: config
                .block_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            record_container: config.record_container.clone(),
        }
    }

    /// Classifies a page body
    ///
    /// Block signals are checked first: a challenge page may well contain
    /// zero record containers, and it must classify as `Blocked`, not
    /// `Empty`.
    pub fn classify(&self, body: &str) -> PageHealth {
        let lowered = body.to_lowercase();
        for marker in &self.markers {
            if lowered.contains(marker) {
                return PageHealth::Blocked {
                    marker: marker.clone(),
                };
            }
        }

        let selector = match Selector::parse(&self.record_container) {
            Ok(s) => s,
            Err(_) => {
                // Config validation guarantees a parseable selector; if it
                // slips through anyway, misreading every page as healthy
                // would loop forever, so fail toward Empty.
                tracing::error!(
                    "record-container selector '{}' failed to parse",
                    self.record_container
                );
                return PageHealth::Empty;
            }
        };

        let document = Html::parse_document(body);
        if document.select(&selector).next().is_none() {
            PageHealth::Empty
        } else {
            PageHealth::Healthy
        }
    }
}

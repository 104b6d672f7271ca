//! Record extraction
//!
//! The orchestration core never inspects raw markup; it hands page bodies to
//! an [`Extractor`] and consumes structured results. A missing attribute is
//! an `Option`, not an exception, and each listing item is its own
//! `Result` so one unparseable item never poisons its page.

mod css;

pub use css::{CssExtractor, SelectorSet};

use crate::sink::DetailPatch;
use thiserror::Error;
use url::Url;

/// Errors for a single extraction attempt
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("listing item has no usable source link")]
    MissingSourceLink,

    #[error("could not resolve link '{0}' against the page URL")]
    UnresolvableLink(String),

    #[error("extraction failed: {0}")]
    Other(String),
}

/// Result type for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Listing-phase output for one catalog item
///
/// The source link is the only mandatory attribute; it doubles as the join
/// key for enrichment. Everything else may be absent and defaults to the
/// sentinel when the record is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub posted: Option<String>,
    pub source_link: String,
}

/// Trait for extractor implementations
pub trait Extractor: Send + Sync {
    /// Extracts candidate record summaries from a listing page body
    ///
    /// One element per discovered item, in document order. Item failures
    /// are values, not aborts.
    fn listing(&self, body: &str, base_url: &Url) -> Vec<ExtractResult<RecordSummary>>;

    /// Extracts a detail-field patch from a detail page body
    fn detail(&self, body: &str) -> ExtractResult<DetailPatch>;

    /// Whether the listing body advertises a further page
    fn has_next_page(&self, body: &str) -> bool;
}

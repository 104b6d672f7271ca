//! Catalog record types
//!
//! A record is created once in the listing phase and mutated at most once by
//! enrichment; it is never deleted. The source link is the join key between
//! the two phases, since a numeric identifier is not always derivable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for a field not yet resolved by enrichment
pub const UNSPECIFIED: &str = "unspecified";

/// A single catalog entry
///
/// Field order defines the CSV column order:
/// `id,title,organization,posted,compensation,description,source_link,collected_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Stable identifier derived from the source link, when derivable
    pub id: Option<String>,

    /// Posting title
    pub title: String,

    /// Hiring organization
    pub organization: String,

    /// Posting date as shown in the catalog
    pub posted: String,

    /// Compensation text; sentinel until enriched
    pub compensation: String,

    /// Full description; sentinel until enriched
    pub description: String,

    /// Canonical link to the detail page; unique per record
    pub source_link: String,

    /// When the summary was extracted
    pub collected_at: DateTime<Utc>,
}

impl JobRecord {
    /// Builds a listing-phase record with sentinel detail fields
    pub fn from_listing(
        title: Option<String>,
        organization: Option<String>,
        posted: Option<String>,
        source_link: String,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: derive_id(&source_link),
            title: title.unwrap_or_else(|| UNSPECIFIED.to_string()),
            organization: organization.unwrap_or_else(|| UNSPECIFIED.to_string()),
            posted: posted.unwrap_or_else(|| UNSPECIFIED.to_string()),
            compensation: UNSPECIFIED.to_string(),
            description: UNSPECIFIED.to_string(),
            source_link,
            collected_at,
        }
    }

    /// True while every detail field is still the sentinel
    ///
    /// Once any detail field holds a real value the record is at its
    /// fixed point and enrichment skips it.
    pub fn needs_enrichment(&self) -> bool {
        self.compensation == UNSPECIFIED && self.description == UNSPECIFIED
    }

    /// Merges a detail patch: present fields overwrite, absent fields keep
    /// their prior values
    pub fn apply(&mut self, patch: &DetailPatch) {
        if let Some(id) = &patch.id {
            self.id = Some(id.clone());
        }
        if let Some(compensation) = &patch.compensation {
            self.compensation = compensation.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
    }
}

/// Partial update produced by the enrichment phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailPatch {
    pub id: Option<String>,
    pub compensation: Option<String>,
    pub description: Option<String>,
}

impl DetailPatch {
    /// True when the patch carries no fields at all
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.compensation.is_none() && self.description.is_none()
    }
}

/// Derives a stable identifier from a detail link
///
/// The catalog encodes the posting id as the trailing numeric segment of
/// the slug (`…/senior-cook-4512987/` → `4512987`). Links without such a
/// segment yield `None`; enrichment may resolve the id later.
pub fn derive_id(link: &str) -> Option<String> {
    let tail = link.trim_end_matches('/').rsplit('-').next()?;
    if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
        Some(tail.to_string())
    } else {
        None
    }
}

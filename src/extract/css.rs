//! CSS-selector driven extractor
//!
//! Site-specific knowledge lives here and nowhere else: which element is a
//! record container, where the title anchor sits, how the detail page lays
//! out compensation and description. Swapping catalogs means swapping the
//! [`SelectorSet`], not touching the crawl core.

use crate::extract::{ExtractError, ExtractResult, Extractor, RecordSummary};
use crate::sink::{derive_id, DetailPatch};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Section headers that terminate the description block on a detail page
const DESCRIPTION_BREAKERS: &[&str] = &[
    "preferred candidate",
    "skills",
    "company profile",
    "compare your profile",
];

/// CSS selectors for one catalog's markup
#[derive(Debug, Clone)]
pub struct SelectorSet {
    /// One match per listing item
    pub record_container: String,
    /// Title anchor within a record container; its href is the source link
    pub title_link: String,
    /// Organization name within a record container
    pub organization: String,
    /// Posting date within a record container
    pub posted: String,
    /// Next-page affordance on the listing page
    pub next_page: String,
    /// Compensation element on the detail page
    pub detail_compensation: String,
    /// Header introducing the description block on the detail page
    pub detail_description_header: String,
    /// Fallback description container on the detail page
    pub detail_description_fallback: String,
    /// Apply link on the detail page; carries the numeric id when the
    /// listing slug did not
    pub detail_apply_link: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            record_container: "li[data-js-job]".to_string(),
            title_link: "h2 a".to_string(),
            organization: ".t-default.t-bold".to_string(),
            posted: "span[data-automation-jobactivedate]".to_string(),
            next_page: "li.pagination-next a".to_string(),
            detail_compensation: "[data-automation-id='id_salary_range'] .u-stretch".to_string(),
            detail_description_header: "h3".to_string(),
            detail_description_fallback: ".u-scrolly".to_string(),
            detail_apply_link: "a.external-job-apply".to_string(),
        }
    }
}

/// Selector-driven extractor
#[derive(Debug, Clone)]
pub struct CssExtractor {
    selectors: SelectorSet,
}

impl CssExtractor {
    pub fn new(selectors: SelectorSet) -> Self {
        Self { selectors }
    }

    fn summarize(&self, item: ElementRef, base_url: &Url) -> ExtractResult<RecordSummary> {
        let anchor = select_first(item, &self.selectors.title_link)
            .ok_or(ExtractError::MissingSourceLink)?;
        let href = anchor
            .value()
            .attr("href")
            .ok_or(ExtractError::MissingSourceLink)?;
        let source_link = base_url
            .join(href)
            .map_err(|_| ExtractError::UnresolvableLink(href.to_string()))?
            .to_string();

        Ok(RecordSummary {
            title: inline_text(anchor),
            organization: select_first(item, &self.selectors.organization).and_then(inline_text),
            posted: select_first(item, &self.selectors.posted).and_then(inline_text),
            source_link,
        })
    }

    /// Walks the siblings following the description header until a section
    /// breaker appears, collecting their text
    fn description_from_header(&self, document: &Html) -> Option<String> {
        let header_selector = Selector::parse(&self.selectors.detail_description_header).ok()?;
        let header = document.select(&header_selector).find(|h| {
            inline_text(*h)
                .map(|t| t.to_lowercase().contains("job description"))
                .unwrap_or(false)
        })?;

        let mut parts = Vec::new();
        for node in header.next_siblings() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            let Some(text) = block_text(element) else {
                continue;
            };
            let lowered = text.to_lowercase();
            if DESCRIPTION_BREAKERS.iter().any(|b| lowered.contains(b)) {
                break;
            }
            parts.push(text);
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

impl Extractor for CssExtractor {
    fn listing(&self, body: &str, base_url: &Url) -> Vec<ExtractResult<RecordSummary>> {
        let document = Html::parse_document(body);
        let container = match Selector::parse(&self.selectors.record_container) {
            Ok(s) => s,
            Err(_) => {
                tracing::error!(
                    "record container selector '{}' failed to parse",
                    self.selectors.record_container
                );
                return Vec::new();
            }
        };

        document
            .select(&container)
            .map(|item| self.summarize(item, base_url))
            .collect()
    }

    fn detail(&self, body: &str) -> ExtractResult<DetailPatch> {
        let document = Html::parse_document(body);

        let compensation = Selector::parse(&self.selectors.detail_compensation)
            .ok()
            .and_then(|s| document.select(&s).next())
            .and_then(inline_text);

        let description = self.description_from_header(&document).or_else(|| {
            Selector::parse(&self.selectors.detail_description_fallback)
                .ok()
                .and_then(|s| document.select(&s).next())
                .and_then(block_text)
        });

        let id = Selector::parse(&self.selectors.detail_apply_link)
            .ok()
            .and_then(|s| document.select(&s).next())
            .and_then(|a| a.value().attr("href"))
            .and_then(derive_id);

        Ok(DetailPatch {
            id,
            compensation,
            description,
        })
    }

    fn has_next_page(&self, body: &str) -> bool {
        let document = Html::parse_document(body);
        match Selector::parse(&self.selectors.next_page) {
            Ok(s) => document.select(&s).next().is_some(),
            Err(_) => false,
        }
    }
}

impl Default for CssExtractor {
    fn default() -> Self {
        Self::new(SelectorSet::default())
    }
}

fn select_first<'a>(scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    scope.select(&selector).next()
}

/// Single-line text content with whitespace collapsed; `None` when empty
fn inline_text(element: ElementRef) -> Option<String> {
    let joined = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Multi-line text content with per-line trimming; `None` when empty
fn block_text(element: ElementRef) -> Option<String> {
    let lines: Vec<String> = element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://catalog.example/en/jobs/?page=1").unwrap()
    }

    const LISTING_BODY: &str = r#"<html><body>
        <ul>
            <li data-js-job>
                <h2><a href="/en/jobs/line-cook-4512987/">Line Cook</a></h2>
                <span class="t-default t-bold">Harbor Kitchen</span>
                <span data-automation-jobactivedate>2 days ago</span>
            </li>
            <li data-js-job>
                <h2><span>No anchor here</span></h2>
            </li>
            <li data-js-job>
                <h2><a href="/en/jobs/pastry-chef-4512990/">Pastry
                    Chef</a></h2>
                <span class="t-default t-bold">Crème &amp; Co</span>
            </li>
        </ul>
        <li class="pagination-next"><a href="?page=2">Next</a></li>
    </body></html>"#;

    #[test]
    fn test_listing_extracts_one_result_per_container() {
        let extractor = CssExtractor::default();
        let items = extractor.listing(LISTING_BODY, &base_url());
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_listing_item_fields() {
        let extractor = CssExtractor::default();
        let items = extractor.listing(LISTING_BODY, &base_url());

        let first = items[0].as_ref().unwrap();
        assert_eq!(first.title.as_deref(), Some("Line Cook"));
        assert_eq!(first.organization.as_deref(), Some("Harbor Kitchen"));
        assert_eq!(first.posted.as_deref(), Some("2 days ago"));
        assert_eq!(
            first.source_link,
            "https://catalog.example/en/jobs/line-cook-4512987/"
        );
    }

    #[test]
    fn test_listing_item_without_link_fails_alone() {
        let extractor = CssExtractor::default();
        let items = extractor.listing(LISTING_BODY, &base_url());

        assert!(matches!(items[1], Err(ExtractError::MissingSourceLink)));
        // Neighbors unaffected
        assert!(items[0].is_ok());
        assert!(items[2].is_ok());
    }

    #[test]
    fn test_listing_title_whitespace_collapsed() {
        let extractor = CssExtractor::default();
        let items = extractor.listing(LISTING_BODY, &base_url());
        let third = items[2].as_ref().unwrap();
        assert_eq!(third.title.as_deref(), Some("Pastry Chef"));
        assert_eq!(third.organization.as_deref(), Some("Crème & Co"));
    }

    #[test]
    fn test_next_page_affordance() {
        let extractor = CssExtractor::default();
        assert!(extractor.has_next_page(LISTING_BODY));
        assert!(!extractor.has_next_page("<html><body>no pagination</body></html>"));
    }

    const DETAIL_BODY: &str = r#"<html><body>
        <h1 id="jobViewJobTitle">Line Cook</h1>
        <div data-automation-id="id_salary_range"><span class="u-stretch">$1,500 - $2,000</span></div>
        <h3>Job Description</h3>
        <p>Prepares the evening menu.</p>
        <p>Reports to the head chef.</p>
        <h4>Skills</h4>
        <p>Knife work.</p>
        <a class="external-job-apply" href="https://catalog.example/apply/line-cook-4512987/">Apply</a>
    </body></html>"#;

    #[test]
    fn test_detail_patch_fields() {
        let extractor = CssExtractor::default();
        let patch = extractor.detail(DETAIL_BODY).unwrap();

        assert_eq!(patch.compensation.as_deref(), Some("$1,500 - $2,000"));
        assert_eq!(
            patch.description.as_deref(),
            Some("Prepares the evening menu.\n\nReports to the head chef.")
        );
        assert_eq!(patch.id.as_deref(), Some("4512987"));
    }

    #[test]
    fn test_description_stops_at_section_breaker() {
        let extractor = CssExtractor::default();
        let patch = extractor.detail(DETAIL_BODY).unwrap();
        assert!(!patch.description.unwrap().contains("Knife work"));
    }

    #[test]
    fn test_detail_fallback_container() {
        let body = r#"<html><body>
            <div class="u-scrolly">
                <p>All the detail text.</p>
            </div>
        </body></html>"#;
        let extractor = CssExtractor::default();
        let patch = extractor.detail(body).unwrap();
        assert_eq!(patch.description.as_deref(), Some("All the detail text."));
    }

    #[test]
    fn test_detail_with_nothing_extractable_is_empty_patch() {
        let extractor = CssExtractor::default();
        let patch = extractor.detail("<html><body></body></html>").unwrap();
        assert!(patch.is_empty());
    }
}

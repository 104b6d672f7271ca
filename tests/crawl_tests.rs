//! Integration tests for the listing-phase controller
//!
//! These tests run the real HTTP fetcher and CSS extractor against wiremock
//! servers and assert on the durable artifacts: the CSV store and the
//! checkpoint file.

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use ukiyo_harvest::checkpoint::CheckpointStore;
use ukiyo_harvest::config::{
    BlockPolicy, CatalogConfig, Config, FetcherConfig, HealthConfig, OutputConfig, PacingConfig,
};
use ukiyo_harvest::extract::{CssExtractor, Extractor, SelectorSet};
use ukiyo_harvest::sink::{CsvSink, JobRecord, RecordSink, UNSPECIFIED};
use ukiyo_harvest::{CrawlController, HttpFetcher, PageFetcher, RunOutcome};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a test configuration with millisecond pacing and temp paths
fn test_config(base_url: &str, dir: &Path) -> Config {
    Config {
        catalog: CatalogConfig {
            page_template: format!("{}/en/jobs/?page={{page}}", base_url),
            start_page: 1,
            max_fetch_retries: 2,
            on_block: BlockPolicy::Stop,
            block_cooldown_ms: [1, 2],
            block_retry_limit: 2,
        },
        pacing: PacingConfig {
            record_delay_ms: [1, 2],
            page_delay_ms: [1, 2],
            long_break_every: 100,
            long_break_ms: [1, 2],
        },
        health: HealthConfig {
            block_markers: vec![
                "access denied".to_string(),
                "captcha".to_string(),
                "please verify".to_string(),
            ],
            record_container: "li[data-js-job]".to_string(),
        },
        fetcher: FetcherConfig {
            user_agents: vec!["TestHarvester/1.0".to_string()],
            proxy: None,
            request_timeout_ms: 5_000,
        },
        output: OutputConfig {
            store_path: dir.join("jobs.csv").to_string_lossy().into_owned(),
            checkpoint_path: dir.join("checkpoint.json").to_string_lossy().into_owned(),
        },
    }
}

fn controller(config: Config) -> CrawlController {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.fetcher.clone()));
    let extractor: Arc<dyn Extractor> = Arc::new(CssExtractor::new(SelectorSet::default()));
    CrawlController::new(config, fetcher, extractor, CancellationToken::new())
}

/// Renders a listing page body: `items` are (slug-with-id, title) pairs
fn listing_body(items: &[(&str, &str)], has_next: bool) -> String {
    let mut body = String::from("<html><body><ul>");
    for (slug, title) in items {
        body.push_str(&format!(
            r#"<li data-js-job>
                <h2><a href="/en/jobs/{}/">{}</a></h2>
                <span class="t-default t-bold">Harbor Kitchen</span>
                <span data-automation-jobactivedate>2 days ago</span>
            </li>"#,
            slug, title
        ));
    }
    body.push_str("</ul>");
    if has_next {
        body.push_str(r#"<ul><li class="pagination-next"><a href="?page=next">Next</a></li></ul>"#);
    }
    body.push_str("</body></html>");
    body
}

async fn mount_listing_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/en/jobs/"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_pages_harvested_in_order() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing_page(
        &server,
        1,
        listing_body(
            &[("cook-101", "Cook"), ("baker-102", "Baker"), ("waiter-103", "Waiter")],
            true,
        ),
    )
    .await;
    mount_listing_page(
        &server,
        2,
        listing_body(
            &[
                ("driver-201", "Driver"),
                ("cleaner-202", "Cleaner"),
                ("barista-203", "Barista"),
            ],
            false,
        ),
    )
    .await;

    let config = test_config(&server.uri(), dir.path());
    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.pages_completed, 2);
    assert_eq!(report.records_persisted, 6);

    // Six records, page-then-intra-page order
    let sink = CsvSink::new(&config.output.store_path);
    let rows = sink.scan().unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Cook", "Baker", "Waiter", "Driver", "Cleaner", "Barista"]
    );

    // Summary fields populated, detail fields still sentinel
    assert_eq!(rows[0].organization, "Harbor Kitchen");
    assert_eq!(rows[0].id.as_deref(), Some("101"));
    assert_eq!(rows[0].compensation, UNSPECIFIED);
    assert!(rows.iter().all(|r| r.needs_enrichment()));

    let checkpoint = CheckpointStore::new(&config.output.checkpoint_path);
    assert_eq!(checkpoint.load(), 2);
}

#[tokio::test]
async fn test_restart_resumes_without_duplicating_records() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    // Simulate a crash after page 1: checkpoint at 1, three records stored
    let checkpoint = CheckpointStore::new(&config.output.checkpoint_path);
    checkpoint.save(1).unwrap();
    let mut sink = CsvSink::new(&config.output.store_path);
    for (slug, title) in [("cook-101", "Cook"), ("baker-102", "Baker"), ("waiter-103", "Waiter")] {
        sink.append(&JobRecord::from_listing(
            Some(title.to_string()),
            Some("Harbor Kitchen".to_string()),
            Some("2 days ago".to_string()),
            format!("{}/en/jobs/{}/", server.uri(), slug),
            chrono::Utc::now(),
        ))
        .unwrap();
    }

    // Page 1 must not be requested again
    Mock::given(method("GET"))
        .and(path("/en/jobs/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("should not be fetched"))
        .expect(0)
        .mount(&server)
        .await;
    mount_listing_page(
        &server,
        2,
        listing_body(
            &[
                ("driver-201", "Driver"),
                ("cleaner-202", "Cleaner"),
                ("barista-203", "Barista"),
            ],
            false,
        ),
    )
    .await;

    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.records_persisted, 3);

    let rows = CsvSink::new(&config.output.store_path).scan().unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[3].title, "Driver");
    assert_eq!(CheckpointStore::new(&config.output.checkpoint_path).load(), 2);
}

#[tokio::test]
async fn test_block_on_second_page_leaves_prior_state_intact() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing_page(
        &server,
        1,
        listing_body(&[("cook-101", "Cook"), ("baker-102", "Baker")], true),
    )
    .await;
    mount_listing_page(
        &server,
        2,
        "<html><body><h1>Access Denied</h1><p>please verify</p></body></html>".to_string(),
    )
    .await;

    let config = test_config(&server.uri(), dir.path());
    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Blocked);

    // Page 1 records untouched, checkpoint not advanced past page 1
    let rows = CsvSink::new(&config.output.store_path).scan().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].title, "Cook");
    assert_eq!(CheckpointStore::new(&config.output.checkpoint_path).load(), 1);
}

#[tokio::test]
async fn test_item_failure_does_not_poison_its_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // The middle container has no title anchor, so it cannot yield a link
    let body = r#"<html><body><ul>
        <li data-js-job><h2><a href="/en/jobs/cook-101/">Cook</a></h2></li>
        <li data-js-job><h2><span>mangled markup</span></h2></li>
        <li data-js-job><h2><a href="/en/jobs/waiter-103/">Waiter</a></h2></li>
    </ul></body></html>"#;
    mount_listing_page(&server, 1, body.to_string()).await;

    let config = test_config(&server.uri(), dir.path());
    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.records_persisted, 2);

    let rows = CsvSink::new(&config.output.store_path).scan().unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Cook", "Waiter"]);

    // A page with persisted records advances the checkpoint
    assert_eq!(CheckpointStore::new(&config.output.checkpoint_path).load(), 1);
}

#[tokio::test]
async fn test_redirect_to_earlier_page_ends_catalog() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    // Resume at page 3; the server bounces back to page 1 which has no
    // record containers
    CheckpointStore::new(&config.output.checkpoint_path)
        .save(2)
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/en/jobs/"))
        .and(query_param("page", "3"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/en/jobs/?page=1", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    mount_listing_page(
        &server,
        1,
        "<html><body><p>Fresh listings every day.</p></body></html>".to_string(),
    )
    .await;

    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::EndOfCatalog);
    assert_eq!(CheckpointStore::new(&config.output.checkpoint_path).load(), 2);
}

#[tokio::test]
async fn test_empty_page_without_redirect_is_no_records() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing_page(
        &server,
        1,
        "<html><body><p>Nothing matching your filters.</p></body></html>".to_string(),
    )
    .await;

    let config = test_config(&server.uri(), dir.path());
    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::NoRecords);
    assert!(CsvSink::new(&config.output.store_path).scan().unwrap().is_empty());
    assert_eq!(CheckpointStore::new(&config.output.checkpoint_path).load(), 0);
}

#[tokio::test]
async fn test_healthy_page_with_zero_persisted_does_not_advance_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Containers present (Healthy) but none yields a source link
    let body = r#"<html><body><ul>
        <li data-js-job><h2><span>broken</span></h2></li>
        <li data-js-job><h2><span>also broken</span></h2></li>
    </ul></body></html>"#;
    mount_listing_page(&server, 1, body.to_string()).await;

    let config = test_config(&server.uri(), dir.path());
    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.records_persisted, 0);
    // The ambiguous page stays unclaimed for the next run
    assert_eq!(CheckpointStore::new(&config.output.checkpoint_path).load(), 0);
}

#[tokio::test]
async fn test_fetch_retries_exhausted_terminates_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/en/jobs/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), dir.path());
    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::FetchFailed);
    assert_eq!(CheckpointStore::new(&config.output.checkpoint_path).load(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start_has_no_side_effects() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), dir.path());
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.fetcher.clone()));
    let extractor: Arc<dyn Extractor> = Arc::new(CssExtractor::new(SelectorSet::default()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut controller = CrawlController::new(config.clone(), fetcher, extractor, cancel);
    let report = controller.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.records_persisted, 0);
    assert!(!Path::new(&config.output.checkpoint_path).exists());
}

#[tokio::test]
async fn test_retry_block_policy_reattempts_same_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // First attempt is a challenge page, the second succeeds
    Mock::given(method("GET"))
        .and(path("/en/jobs/"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>captcha</body></html>"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/en/jobs/"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_body(&[("cook-101", "Cook")], false)),
        )
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri(), dir.path());
    config.catalog.on_block = BlockPolicy::Retry;

    let report = controller(config.clone()).run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.records_persisted, 1);
    assert_eq!(CheckpointStore::new(&config.output.checkpoint_path).load(), 1);
}

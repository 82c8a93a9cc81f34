//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing pages and run the full
//! category x fiscal-year x page traversal end-to-end.

use ciaa_crawler::config::{Config, SourceConfig};
use ciaa_crawler::crawler::{
    build_http_client, fetch_page, fetch_page_with_retry, CancelToken, Coordinator, FetchError,
    FetchResult, Pacer,
};
use ciaa_crawler::output::{
    dedup_records, preflight, read_records, write_all, JsonFileSink, OutputSink, SqliteSink,
};
use ciaa_crawler::record::{Category, FiscalYear};
use ciaa_crawler::storage::{CaseStore, SqliteStorage};
use ciaa_crawler::ConfigError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHARGE_PATH: &str = "/pressreleaseCategory/charge";

/// Creates a fast test configuration against the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.source.base_url = base_url.to_string();
    config.source.request_timeout_ms = 2_000;
    config.crawl.categories = vec!["charge".to_string()];
    config.crawl.use_fiscal_years = false;
    config.crawl.max_pages = 20;
    config.crawl.page_delay_ms = 0;
    config.crawl.fiscal_year_delay_ms = 0;
    config.crawl.category_delay_ms = 0;
    config
}

/// Renders a listing page with `count` full rows starting at detail id `first_id`
fn listing_page(first_id: usize, count: usize, has_next: bool) -> String {
    let rows: String = (first_id..first_id + count)
        .map(|id| {
            format!(
                r#"<tr>
                    <td>2082-01-15</td>
                    <td><a href="/pressrelease/{id}">Case {id} रू.१,२५,६६,५५५।५०</a></td>
                    <td>Accused {id}</td>
                    <td>Office {id}</td>
                    <td>Bribery</td>
                    <td>रू. ५,०००</td>
                    <td><a href="/uploads/{id}.pdf">PDF</a></td>
                </tr>"#
            )
        })
        .collect();

    let pagination = if has_next {
        r#"<ul class="pagination"><li><a href="?page=1">1</a></li><li><a rel="next" href="?page=2">Next</a></li></ul>"#
    } else {
        r#"<ul class="pagination"><li><a href="?page=1">1</a></li></ul>"#
    };

    format!(
        "<html><body><table><thead><tr><th>Date</th></tr></thead><tbody>{}</tbody></table>{}</body></html>",
        rows, pagination
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_two_page_listing_yields_all_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .and(query_param("page", "2"))
        .respond_with(html(listing_page(6, 3, false)))
        .expect(1)
        .mount(&mock_server)
        .await;

    // First page carries no query in a non-fiscal-year crawl
    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(html(listing_page(1, 5, true)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert_eq!(outcome.records.len(), 8);
    assert_eq!(outcome.report.total_records, 8);
    assert_eq!(outcome.report.pages_fetched, 2);
    assert_eq!(outcome.report.page_delays, 1);
    assert_eq!(outcome.report.fiscal_year_delays, 0);
    assert_eq!(outcome.report.category_delays, 0);
    assert!(!outcome.report.cancelled);

    let first = &outcome.records[0];
    assert_eq!(first.id, "1");
    assert_eq!(first.category, Category::ChargeSheet);
    assert_eq!(first.fiscal_year, "current");
    assert_eq!(first.fiscal_year_gregorian, None);
    assert_eq!(first.date, "2082-01-15");
    assert!(first.date_parsed);
    assert_eq!(first.accused_person, "Accused 1");
    assert_eq!(first.accusation, "Bribery");
    assert_eq!(
        first.detail_url.as_deref(),
        Some(format!("{}/pressrelease/1", mock_server.uri()).as_str())
    );
    assert_eq!(first.download_links.len(), 1);

    let ids: Vec<&str> = outcome.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7", "8"]);
}

#[tokio::test]
async fn test_no_next_page_stops_after_one_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(html(listing_page(1, 4, false)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawl.max_pages = 500;

    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert_eq!(outcome.records.len(), 4);
    assert_eq!(outcome.report.pages_fetched, 1);
    assert_eq!(outcome.report.page_delays, 0);
}

#[tokio::test]
async fn test_page_ceiling_bounds_runaway_pagination() {
    let mock_server = MockServer::start().await;

    // Every page claims a successor
    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(html(listing_page(1, 2, true)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawl.max_pages = 3;

    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.pages_fetched, 3);
    // No delay after the page that hit the ceiling
    assert_eq!(outcome.report.page_delays, 2);
    assert_eq!(outcome.records.len(), 6);

    // Same rows on every page collapse to one record each
    let (unique, duplicates) = dedup_records(outcome.records);
    assert_eq!(unique.len(), 2);
    assert_eq!(duplicates, 4);
}

#[tokio::test]
async fn test_empty_page_ends_pagination_despite_next_link() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(html(listing_page(1, 0, true)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.report.pages_fetched, 1);
    assert_eq!(outcome.report.page_delays, 0);
}

#[tokio::test]
async fn test_timeout_contributes_zero_and_crawl_continues() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .and(query_param("fiscal_year", "11"))
        .respond_with(html(listing_page(1, 3, false)).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .and(query_param("fiscal_year", "12"))
        .and(query_param("page", "1"))
        .respond_with(html(listing_page(10, 2, false)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.source.request_timeout_ms = 300;
    config.crawl.use_fiscal_years = true;
    config.fiscal_years = vec![
        FiscalYear::new("11", "2081/82", "2024/25"),
        FiscalYear::new("12", "2082/83", "2025/26"),
    ];

    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert_eq!(
        outcome.report.records_for(Category::ChargeSheet, "2081/82"),
        Some(0)
    );
    assert_eq!(
        outcome.report.records_for(Category::ChargeSheet, "2082/83"),
        Some(2)
    );
    assert_eq!(outcome.report.failed_fetches, 1);
    assert_eq!(outcome.report.fiscal_year_delays, 1);
    assert_eq!(outcome.records.len(), 2);
    assert!(outcome
        .records
        .iter()
        .all(|r| r.fiscal_year == "2082/83"
            && r.fiscal_year_gregorian.as_deref() == Some("2025/26")));
}

#[tokio::test]
async fn test_server_error_is_retried_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(html(listing_page(1, 2, false)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.source.transport_retries = 2;
    config.source.retry_backoff_ms = 10;

    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.report.failed_fetches, 0);
}

#[tokio::test]
async fn test_server_error_without_retries_counts_as_empty_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.report.failed_fetches, 1);
    assert_eq!(outcome.report.pages_fetched, 0);
}

#[tokio::test]
async fn test_category_delays_between_categories_only() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html(listing_page(1, 1, false)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawl.categories = vec![
        "charge".to_string(),
        "sting".to_string(),
        "appeal".to_string(),
    ];

    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert_eq!(outcome.report.category_delays, 2);
    assert_eq!(outcome.report.by_category.len(), 3);
    assert_eq!(outcome.records[1].category, Category::StingOperation);
}

#[tokio::test]
async fn test_cancel_interrupts_in_flight_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html(listing_page(1, 1, false)).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.source.request_timeout_ms = 30_000;

    let cancel = CancelToken::new();
    let mut coordinator = Coordinator::with_cancel_token(config, cancel.clone())
        .expect("Failed to create coordinator");

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let outcome = coordinator.run().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(outcome.report.cancelled);
    assert!(outcome.records.is_empty());
}

#[tokio::test]
async fn test_crawl_results_land_in_json_and_sqlite() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(html(listing_page(1, 3, false)))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let json_path = dir.path().join("out").join("cases.json");
    let db_path = dir.path().join("cases.db");

    let mut sinks: Vec<Box<dyn OutputSink>> = vec![
        Box::new(JsonFileSink::new(&json_path)),
        Box::new(SqliteSink::new(&db_path, "test-hash", "crawl")),
    ];
    preflight(&mut sinks).expect("Sinks should be writable");

    // Two identical runs: the second must update, not duplicate
    for run in 0..2 {
        let config = create_test_config(&mock_server.uri());
        let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
        let outcome = coordinator.run().await;
        let (records, _) = dedup_records(outcome.records);

        let reports = write_all(&mut sinks, &records).expect("Failed to write outputs");
        assert_eq!(reports[0].written, 3);
        if run == 0 {
            assert_eq!(reports[1].inserted, Some(3));
        } else {
            assert_eq!(reports[1].inserted, Some(0));
            assert_eq!(reports[1].updated, Some(3));
        }
    }

    let stored = read_records(&json_path).expect("Failed to read JSON output");
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].category, Category::ChargeSheet);

    let raw = std::fs::read_to_string(&json_path).unwrap();
    assert!(raw.contains("\"accusedPerson\""));
    assert!(raw.contains("\"Charge Sheet\""));

    let storage = SqliteStorage::new(&db_path).expect("Failed to open database");
    assert_eq!(storage.count_cases().unwrap(), 3);
    let latest = storage.get_latest_import_run().unwrap().unwrap();
    assert_eq!(latest.config_hash, "test-hash");
}

#[tokio::test]
async fn test_unwritable_output_fails_before_any_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html(listing_page(1, 1, false)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let mut sinks: Vec<Box<dyn OutputSink>> =
        vec![Box::new(JsonFileSink::new(blocker.join("cases.json")))];

    let err = preflight(&mut sinks).unwrap_err();
    assert!(matches!(err, ConfigError::UnwritableOutput(_)));
}

#[tokio::test]
async fn test_fetch_sends_static_user_agent_and_detects_next_page() {
    let mock_server = MockServer::start().await;
    let source = SourceConfig::default();

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .and(header("user-agent", source.user_agent.as_str()))
        .respond_with(html(listing_page(1, 1, true)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_http_client(&source).expect("Failed to build client");
    let url = Url::parse(&format!("{}{}", mock_server.uri(), CHARGE_PATH)).unwrap();

    match fetch_page(&client, &url).await {
        FetchResult::Success {
            status_code,
            has_next_page,
            body,
            ..
        } => {
            assert_eq!(status_code, 200);
            assert!(has_next_page);
            assert!(body.contains("Accused 1"));
        }
        FetchResult::Failed { error, .. } => panic!("Unexpected failure: {}", error),
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_http_client(&SourceConfig::default()).expect("Failed to build client");
    let url = Url::parse(&format!("{}{}", mock_server.uri(), CHARGE_PATH)).unwrap();

    let result = fetch_page_with_retry(&client, &url, 3, Duration::from_millis(10)).await;
    match result {
        FetchResult::Failed { error, attempts } => {
            assert_eq!(error, FetchError::Status(404));
            assert_eq!(attempts, 1);
        }
        FetchResult::Success { .. } => panic!("404 must not succeed"),
    }
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = build_http_client(&SourceConfig::default()).expect("Failed to build client");
    let url = Url::parse(&format!("{}{}", mock_server.uri(), CHARGE_PATH)).unwrap();

    let result = fetch_page_with_retry(&client, &url, 2, Duration::from_millis(5)).await;
    match result {
        FetchResult::Failed { error, attempts } => {
            assert_eq!(error, FetchError::Status(502));
            assert_eq!(attempts, 3);
        }
        FetchResult::Success { .. } => panic!("502 must not succeed"),
    }
}

#[tokio::test]
async fn test_redirected_page_resolves_against_final_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/archive/charge/"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = listing_page(1, 1, false).replace(
        r#"href="/pressrelease/1""#,
        r#"href="detail/1""#,
    );
    Mock::given(method("GET"))
        .and(path("/archive/charge/"))
        .respond_with(html(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await;

    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(
        record.source_url,
        format!("{}/archive/charge/", mock_server.uri())
    );
    assert_eq!(
        record.detail_url.as_deref(),
        Some(format!("{}/archive/charge/detail/1", mock_server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_shared_budget_serializes_coordinators() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHARGE_PATH))
        .respond_with(html(listing_page(1, 2, false)).set_delay(Duration::from_millis(300)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let budget = Arc::new(Semaphore::new(1));
    let coordinator_with_budget = || {
        let config = create_test_config(&mock_server.uri());
        let pacer = Pacer::new(&config.crawl, CancelToken::new()).with_budget(budget.clone());
        Coordinator::new(config)
            .expect("Failed to create coordinator")
            .with_pacer(pacer)
    };
    let mut first = coordinator_with_budget();
    let mut second = coordinator_with_budget();

    let started = Instant::now();
    let (a, b) = tokio::join!(first.run(), second.run());

    // One permit between them: the two requests cannot overlap
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(a.records.len(), 2);
    assert_eq!(b.records.len(), 2);
    assert_eq!(budget.available_permits(), 1);
}

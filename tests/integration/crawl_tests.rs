//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the reader proxy and test the
//! full session cycle end-to-end: seed, select, crawl, persist, reload,
//! retry, and export.

use reader_crawler::config::{Config, CrawlerConfig, OutputConfig, ProxyConfig};
use reader_crawler::crawler::Coordinator;
use reader_crawler::output::{write_export, ExportFormat};
use reader_crawler::state::{CrawlSession, CrawlStatus, SessionPhase};
use reader_crawler::storage::{ResultStore, SessionStore, SqliteStorage};
use reader_crawler::CrawlerError;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEED: &str = "https://docs.example/";

/// Creates a test configuration pointing at the mock proxy
fn create_test_config(proxy_url: &str, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            concurrency_limit: 2,
            max_retries: 1,
            retry_delay_ms: 0, // No waiting in tests
        },
        proxy: ProxyConfig {
            base_url: proxy_url.to_string(),
            request_timeout_secs: 5,
            user_agent: "TestBot/1.0".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.display().to_string(),
            ..OutputConfig::default()
        },
    }
}

/// Proxy path for a target page
fn proxied(target: &str) -> String {
    format!("/{}", urlencoding::encode(target))
}

async fn mount_page(server: &MockServer, target: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(proxied(target)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_session_cycle() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED,
        "# Docs\n\n[Guide](/guide) [API](/api#top) [Elsewhere](https://elsewhere.example/x)",
    )
    .await;
    mount_page(
        &mock_server,
        "https://docs.example/guide",
        "# Guide\n\n<a href=\"/guide/install\">Install</a>",
    )
    .await;

    // The API page fails for both attempts of the first crawl, then recovers
    Mock::given(method("GET"))
        .and(path(proxied("https://docs.example/api")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "https://docs.example/api", "# API").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&mock_server.uri(), &db_path);
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    // Seed
    let coordinator = Coordinator::from_config(&config, CrawlSession::new()).unwrap();
    let seed = coordinator.fetch_initial_content(SEED).await.unwrap();
    assert_eq!(seed.links_found, 2);

    let urls: Vec<_> = coordinator.frontier().into_iter().map(|l| l.url).collect();
    assert_eq!(
        urls,
        vec!["https://docs.example/guide", "https://docs.example/api"]
    );

    // Crawl everything that was discovered
    coordinator.select_all(true);
    let report = coordinator.crawl_selected().await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(coordinator.progress(), 100);
    assert!(coordinator
        .frontier()
        .iter()
        .any(|l| l.url == "https://docs.example/guide/install" && l.text == "Install"));

    assert_eq!(coordinator.persist_completed(&mut storage).unwrap(), 2);
    storage.save_session(&coordinator.snapshot()).unwrap();
    drop(coordinator);

    // A later invocation picks the session back up and retries the failure
    let restored = storage.load_session().unwrap().unwrap();
    assert_eq!(restored.phase, SessionPhase::AwaitingSelection);
    let coordinator = Coordinator::from_config(&config, restored).unwrap();

    let report = coordinator.retry_failed().await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(coordinator.snapshot_stats().error, 0);

    assert_eq!(coordinator.persist_completed(&mut storage).unwrap(), 3);
    let api = storage.get_page("https://docs.example/api").unwrap().unwrap();
    assert_eq!(api.content, "# API");

    // Nothing left to retry
    assert!(coordinator.retry_failed().await.unwrap().is_noop());

    // Export what was stored
    let pages = storage.get_all_pages().unwrap();
    let exported = write_export(&pages, ExportFormat::Markdown, &dir.path().join("export")).unwrap();
    let markdown = std::fs::read_to_string(exported).unwrap();
    assert!(markdown.contains("# https://docs.example/\n\n# Docs"));
    assert!(markdown.contains("# https://docs.example/api\n\n# API\n\n---"));
}

#[tokio::test]
async fn test_seed_failure_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2) // One attempt plus one retry
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir.path().join("crawl.db"));
    let coordinator = Coordinator::from_config(&config, CrawlSession::new()).unwrap();

    let result = coordinator.fetch_initial_content(SEED).await;

    assert!(matches!(
        result,
        Err(CrawlerError::FetchFailed { attempts: 2, .. })
    ));
    assert_eq!(coordinator.phase(), SessionPhase::Idle);
    assert!(coordinator.frontier().is_empty());
    assert_eq!(coordinator.snapshot_stats().total, 0);
}

#[tokio::test]
async fn test_selection_survives_reload() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, SEED, "[A](/a) [B](/b) [C](/c)").await;
    mount_page(&mock_server, "https://docs.example/b", "B").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&mock_server.uri(), &db_path);
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    {
        let coordinator = Coordinator::from_config(&config, CrawlSession::new()).unwrap();
        coordinator.fetch_initial_content(SEED).await.unwrap();
        assert_eq!(coordinator.select_matching("/b"), 1);
        storage.save_session(&coordinator.snapshot()).unwrap();
    }

    let restored = storage.load_session().unwrap().unwrap();
    let coordinator = Coordinator::from_config(&config, restored).unwrap();
    let report = coordinator.crawl_selected().await.unwrap();

    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 1);
    let session = coordinator.snapshot();
    assert_eq!(
        session.table.status("https://docs.example/b"),
        Some(CrawlStatus::Completed)
    );
    assert!(session.table.get("https://docs.example/a").is_none());

    // Reset clears the saved session but keeps stored results
    coordinator.persist_completed(&mut storage).unwrap();
    storage.clear_session().unwrap();
    assert!(storage.load_session().unwrap().is_none());
    assert_eq!(storage.get_all_pages().unwrap().len(), 2);
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end. The mock server listens on
//! 127.0.0.1, so every record lands under `domains/ip/127.0.0.1/`.

use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tld_crawler::config::{Config, CrawlerConfig, OutputConfig, SeedConfig, UserAgentConfig};
use tld_crawler::crawler::{Coordinator, EntryState};
use tld_crawler::output::CrawlStatistics;
use tld_crawler::IdentityPolicy;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing under `dir`
fn create_test_config(dir: &TempDir, seeds: Vec<String>) -> Config {
    let tld_table = dir.path().join("tlds.txt");
    std::fs::write(&tld_table, "# reference table\ncom, net, org\n.jp\n").unwrap();

    Config {
        crawler: CrawlerConfig {
            max_workers: 4,
            max_domain_concurrency: 2,
            politeness_delay_ms: 10, // Very short for testing
            max_retries: 2,
            retry_delay_ms: 10,
            request_timeout_secs: 5,
            max_body_bytes: 1024 * 1024,
            follow_relative_links: false,
            respect_crawl_delay: true,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            domains_dir: dir.path().join("domains").to_string_lossy().into_owned(),
            tld_table: tld_table.to_string_lossy().into_owned(),
            persist_body: false,
        },
        identity: IdentityPolicy::default(),
        seeds: SeedConfig {
            urls: seeds,
            file: None,
        },
    }
}

/// Directory holding every record for the mock server's host
fn record_dir(dir: &TempDir) -> PathBuf {
    dir.path().join("domains/ip/127.0.0.1")
}

/// Identity key of a mock server page; the port is not part of it
fn key(page: &str) -> String {
    format!("http://127.0.0.1{}", page)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_robots(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn crawl(config: Config) -> (Coordinator, CrawlStatistics) {
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let stats = tokio::time::timeout(Duration::from_secs(20), coordinator.run())
        .await
        .expect("Crawl did not finish")
        .expect("Crawl failed");
    (coordinator, stats)
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(
        &mock_server,
        ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"),
    )
    .await;
    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{0}/page1">Page 1</a>
            <a href="{0}/page2/">Page 2</a>
            <a href="{0}/page1#section">Page 1 again</a>
            </body></html>"#,
            base_url
        ),
    )
    .await;
    mount_page(&mock_server, "/page1", "<p>Content 1</p>".to_string()).await;
    mount_page(&mock_server, "/page2", "<p>Content 2</p>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, vec![format!("{}/", base_url)]);
    let (coordinator, stats) = crawl(config).await;

    let records = record_dir(&dir);
    assert!(records.join("127.0.0.1_.txt").exists());
    assert!(records.join("127.0.0.1_page1.txt").exists());
    assert!(records.join("127.0.0.1_page2.txt").exists());
    assert!(dir.path().join("domains/com").is_dir());
    assert!(dir.path().join("domains/jp").is_dir());

    assert_eq!(stats.pages_processed, 3);
    assert_eq!(stats.pages_written, 3);
    assert_eq!(stats.links_admitted, 2);
    assert_eq!(stats.robots_fetches, 1);
    assert!(coordinator.frontier().is_drained());
}

#[tokio::test]
async fn test_robots_disallow_blocks_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(
        &mock_server,
        ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"),
    )
    .await;
    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<a href="{0}/admin/users">Admin</a><a href="{0}/public">Public</a>"#,
            base_url
        ),
    )
    .await;
    mount_page(&mock_server, "/public", "<p>Public</p>".to_string()).await;

    Mock::given(method("GET"))
        .and(path("/admin/users"))
        .respond_with(html("<p>Secret</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, vec![format!("{}/", base_url)]);
    let (coordinator, stats) = crawl(config).await;

    assert_eq!(stats.robots_blocked, 1);
    assert!(record_dir(&dir).join("127.0.0.1_public.txt").exists());
    assert!(!record_dir(&dir).join("127.0.0.1_admin_users.txt").exists());
    assert_eq!(
        coordinator.frontier().status(&key("/public")),
        Some(EntryState::Done)
    );
}

#[tokio::test]
async fn test_robots_server_error_allows_all() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(&mock_server, ResponseTemplate::new(500)).await;
    mount_page(
        &mock_server,
        "/",
        format!(r#"<a href="{}/private">Private</a>"#, base_url),
    )
    .await;
    mount_page(&mock_server, "/private", "<p>Private</p>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let (_, stats) = crawl(create_test_config(&dir, vec![format!("{}/", base_url)])).await;

    assert_eq!(stats.robots_blocked, 0);
    assert_eq!(stats.pages_processed, 2);
    assert!(record_dir(&dir).join("127.0.0.1_private.txt").exists());
}

#[tokio::test]
async fn test_rerun_keeps_existing_records() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(r#"<a href="{}/page1">Page 1</a>"#, base_url),
    )
    .await;
    mount_page(&mock_server, "/page1", "<p>Content 1</p>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, vec![format!("{}/", base_url)]);
    config.output.persist_body = true;

    let (_, first) = crawl(config.clone()).await;
    assert_eq!(first.pages_written, 2);

    let marker = record_dir(&dir).join("127.0.0.1_page1.txt");
    assert!(std::fs::read_to_string(&marker).unwrap().contains("Content 1"));
    std::fs::write(&marker, "sentinel").unwrap();

    let (_, second) = crawl(config).await;

    assert_eq!(second.pages_written, 0);
    assert_eq!(second.already_stored, 2);
    assert_eq!(second.pages_processed, 2);
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "sentinel");
}

#[tokio::test]
async fn test_transient_error_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/flaky", "<p>Recovered</p>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let (_, stats) = crawl(create_test_config(&dir, vec![format!("{}/flaky", base_url)])).await;

    assert_eq!(stats.retries, 1);
    assert_eq!(stats.fetch_failures, 0);
    assert!(record_dir(&dir).join("127.0.0.1_flaky.txt").exists());
}

#[tokio::test]
async fn test_permanent_error_dropped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(r#"<a href="{}/missing">Gone</a>"#, base_url),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, vec![format!("{}/", base_url)]);
    let (coordinator, stats) = crawl(config).await;

    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.retries, 0);
    assert_eq!(
        coordinator.frontier().status(&key("/missing")),
        Some(EntryState::Done)
    );
    assert!(!record_dir(&dir).join("127.0.0.1_missing.txt").exists());
}

#[tokio::test]
async fn test_oversized_body_dropped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(r#"<a href="{0}/big">Big</a><a href="{0}/small">Small</a>"#, base_url),
    )
    .await;
    mount_page(&mock_server, "/big", format!("<p>{}</p>", "x".repeat(4096))).await;
    mount_page(&mock_server, "/small", "<p>Small</p>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, vec![format!("{}/", base_url)]);
    config.crawler.max_body_bytes = 1024;

    let (coordinator, stats) = crawl(config).await;

    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.retries, 0);
    assert_eq!(
        coordinator.frontier().status(&key("/big")),
        Some(EntryState::Done)
    );
    assert!(!record_dir(&dir).join("127.0.0.1_big.txt").exists());
    assert!(record_dir(&dir).join("127.0.0.1_small.txt").exists());
}

#[tokio::test]
async fn test_links_not_extracted_from_non_html() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<a href="{}/hidden">Hidden</a>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html("<p>Hidden</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_, stats) = crawl(create_test_config(&dir, vec![format!("{}/notes", base_url)])).await;

    assert_eq!(stats.pages_processed, 1);
    assert_eq!(stats.links_found, 0);
    assert!(record_dir(&dir).join("127.0.0.1_notes.txt").exists());
}

#[tokio::test]
async fn test_relative_links_followed_when_enabled() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/docs/index", r#"<a href="intro">Intro</a>"#.to_string()).await;
    mount_page(&mock_server, "/docs/intro", "<p>Intro</p>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, vec![format!("{}/docs/index", base_url)]);
    config.crawler.follow_relative_links = true;

    let (_, stats) = crawl(config).await;

    assert_eq!(stats.pages_processed, 2);
    assert!(record_dir(&dir).join("127.0.0.1_docs_intro.txt").exists());
}

#[tokio::test]
async fn test_legacy_charset_persisted_as_utf8() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let (body, _, _) = encoding_rs::SHIFT_JIS.encode("<title>日本語</title><p>本文</p>");
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.into_owned())
                .insert_header("content-type", "text/html; charset=Shift_JIS"),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, vec![format!("{}/", base_url)]);
    config.output.persist_body = true;

    crawl(config).await;

    let text = std::fs::read_to_string(record_dir(&dir).join("127.0.0.1_.txt")).unwrap();
    assert!(text.contains("本文"));
}

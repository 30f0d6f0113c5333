//! Integration tests for the fetch → parse → cache → query pipeline.
//!
//! Each test runs against its own wiremock upstream, so retries, status
//! codes and stale fallback go through the real HTTP client.

use std::time::Duration;

use koeln_presse::feed::{
    FeedStore, FetchError, HttpFeedSource, ParseError, RefreshError, RetryPolicy, StoreError,
    StoreSettings,
};
use koeln_presse::QueryEngine;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Pressemeldungen der Stadt Köln</title>
    <link>https://www.stadt-koeln.de</link>
    <item>
      <title>Baustellen am Ebertplatz</title>
      <link>/presse/mitteilungen/1</link>
      <description>Kurzfassung</description>
      <content:encoded><![CDATA[<p>Ausführlicher Text</p>]]></content:encoded>
      <pubDate>Mon, 15 Jan 2024 10:30:00 +0100</pubDate>
      <category>Verkehr</category>
    </item>
    <item>
      <guid>pm-2</guid>
      <title>Museumsnacht</title>
      <link>https://www.stadt-koeln.de/presse/mitteilungen/2</link>
      <pubDate>Tue, 16 Jan 2024 08:00:00 +0100</pubDate>
      <category>Kultur</category>
      <category>Baustellen</category>
    </item>
  </channel>
</rss>"#;

fn settings(ttl: Duration) -> StoreSettings {
    StoreSettings {
        ttl,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            backoff_factor: 2.0,
        },
        ..StoreSettings::default()
    }
}

fn store(server: &MockServer, ttl: Duration) -> FeedStore<HttpFeedSource> {
    let source = HttpFeedSource::new(
        format!("{}/rss/pressemeldungen.xml", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();
    FeedStore::new(source, settings(ttl))
}

async fn serve_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rss/pressemeldungen.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(server)
        .await;
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_queries_over_fetched_feed() {
    let server = MockServer::start().await;
    serve_feed(&server).await;
    let engine = QueryEngine::new(store(&server, Duration::from_secs(300)));

    let latest = engine.latest(10).await.unwrap();
    let titles: Vec<&str> = latest.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Museumsnacht", "Baustellen am Ebertplatz"]);

    let first = &latest[1];
    assert_eq!(first.link, "https://www.stadt-koeln.de/presse/mitteilungen/1");
    assert_eq!(first.description.as_deref(), Some("<p>Ausführlicher Text</p>"));
    assert_eq!(first.raw_guid, None);
    assert_eq!(first.id.len(), 40);

    let found = engine.get_by_id("pm-2").await.unwrap().unwrap();
    assert_eq!(found.title, "Museumsnacht");

    let hits = engine.search("baustellen", 20).await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), "pm-2"]);

    assert_eq!(
        engine.list_categories().await.unwrap(),
        vec!["Baustellen", "Kultur", "Verkehr"]
    );
}

#[tokio::test]
async fn test_cached_snapshot_not_refetched_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;
    let engine = QueryEngine::new(store(&server, Duration::from_secs(300)));

    engine.latest(10).await.unwrap();
    engine.search("museum", 5).await.unwrap();
    engine.list_categories().await.unwrap();
}

#[tokio::test]
async fn test_ids_stable_across_refetches() {
    let server = MockServer::start().await;
    serve_feed(&server).await;
    let store = store(&server, Duration::ZERO);

    let first: Vec<String> = store
        .ensure_fresh()
        .await
        .unwrap()
        .items()
        .iter()
        .map(|i| i.id.clone())
        .collect();
    store.force_refresh().await.unwrap();
    let second: Vec<String> = store
        .current()
        .await
        .unwrap()
        .items()
        .iter()
        .map(|i| i.id.clone())
        .collect();

    assert_eq!(first, second);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_stale_snapshot_served_after_upstream_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    let store = store(&server, Duration::ZERO);

    let original = store.ensure_fresh().await.unwrap();
    let served = store.ensure_fresh().await.unwrap();

    assert!(std::sync::Arc::ptr_eq(&original, &served));
    assert_eq!(served.len(), 2);
}

#[tokio::test]
async fn test_outage_without_cache_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    let engine = QueryEngine::new(store(&server, Duration::from_secs(300)));

    let err = engine.latest(10).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::FetchFailed(RefreshError::Transport(FetchError::HttpStatus(500)))
    ));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server, Duration::from_secs(300))
        .ensure_fresh()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::FetchFailed(RefreshError::Transport(FetchError::HttpStatus(404)))
    ));
}

#[tokio::test]
async fn test_recovers_after_transient_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    serve_feed(&server).await;

    let snapshot = store(&server, Duration::from_secs(300))
        .ensure_fresh()
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn test_html_error_page_is_malformed_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>Wartungsarbeiten<br></body>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server, Duration::from_secs(300))
        .ensure_fresh()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::FetchFailed(RefreshError::Parse(ParseError::Malformed(_)))
    ));
}

#[tokio::test]
async fn test_forced_refresh_failure_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss><channel></channel></rss>"))
        .mount(&server)
        .await;
    let store = store(&server, Duration::from_secs(300));

    store.ensure_fresh().await.unwrap();
    let err = store.force_refresh().await.unwrap_err();

    assert!(matches!(
        err,
        StoreError::RefreshFailed(RefreshError::Parse(ParseError::EmptyFeed))
    ));
    assert_eq!(store.current().await.unwrap().len(), 2);
}

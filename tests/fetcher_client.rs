mod helpers;

use gazette::fetcher::{FeedClient, FeedError, FeedFetcher};
use helpers::{Item, rss_feed};
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;
    let body = rss_feed(&[
        Item::new("First post", "https://blog.example.com/1"),
        Item::new("Second post", "https://blog.example.com/2"),
    ]);

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.into_bytes())
                .insert_header("Content-Type", "application/rss+xml; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/feed.xml", mock_server.uri());
    let entries = FeedClient::new()
        .unwrap()
        .fetch_and_parse(&url, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "First post");
    assert_eq!(entries[1].link, "https://blog.example.com/2");
    assert!(entries[0].published.is_some());
}

#[tokio::test]
async fn test_fetch_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing.xml", mock_server.uri());
    let result = FeedClient::new().unwrap().fetch_and_parse(&url, TIMEOUT).await;

    match result {
        Err(FeedError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 404);
            assert!(!retriable);
        }
        other => panic!("Expected HTTP 404 error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_500_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let url = format!("{}/error", mock_server.uri());
    let result = FeedClient::new().unwrap().fetch_and_parse(&url, TIMEOUT).await;

    match result {
        Err(FeedError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 500);
            assert!(retriable);
        }
        other => panic!("Expected HTTP 500 error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_unparseable_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/not-a-feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("<html><body>Just a page</body></html>".as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/not-a-feed", mock_server.uri());
    let result = FeedClient::new().unwrap().fetch_and_parse(&url, TIMEOUT).await;

    assert!(matches!(result, Err(FeedError::Parse(_))));
}

#[tokio::test]
async fn test_fetch_gzip_compression() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let original = rss_feed(&[Item::new("Zipped", "https://blog.example.com/zipped")]);

    // Gzip the content
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(original.as_bytes()).unwrap();
    let compressed_data = encoder.finish().unwrap();

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gzipped"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(compressed_data)
                .insert_header("Content-Type", "application/rss+xml")
                .insert_header("Content-Encoding", "gzip"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/gzipped", mock_server.uri());
    let entries = FeedClient::new()
        .unwrap()
        .fetch_and_parse(&url, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Zipped");
}

#[tokio::test]
async fn test_fetch_unsupported_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF]) // JPEG header
                .insert_header("Content-Type", "image/jpeg"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/image", mock_server.uri());
    let result = FeedClient::new().unwrap().fetch_and_parse(&url, TIMEOUT).await;

    match result {
        Err(FeedError::UnsupportedContentType(content_type)) => {
            assert_eq!(content_type, "image/jpeg");
        }
        other => panic!("Expected UnsupportedContentType error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_slow_feed_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(rss_feed(&[]).into_bytes())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/slow", mock_server.uri());
    let result = FeedClient::new()
        .unwrap()
        .fetch_and_parse(&url, Duration::from_millis(200))
        .await;

    assert!(matches!(result, Err(FeedError::RequestTimeout)));
}

#[tokio::test]
async fn test_fetch_invalid_url() {
    let result = FeedClient::new()
        .unwrap()
        .fetch_and_parse("not-a-valid-url", TIMEOUT)
        .await;

    match result {
        Err(FeedError::InvalidUrl(_)) => {}
        other => panic!("Expected InvalidUrl error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_refused_connection() {
    // Nothing listens on the discard port.
    let result = FeedClient::new()
        .unwrap()
        .fetch_and_parse("http://127.0.0.1:9/feed.xml", TIMEOUT)
        .await;

    match result {
        Err(e @ FeedError::Connect(_)) => assert!(e.should_retry()),
        other => panic!("Expected Connect error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_retry_classification() {
    assert!(!FeedError::InvalidUrl(url::ParseError::EmptyHost).should_retry());
    assert!(!FeedError::BodyTooLarge(1000).should_retry());
    assert!(!FeedError::UnsupportedContentType("image/png".to_string()).should_retry());
    assert!(!FeedError::Parse("no root element".to_string()).should_retry());

    assert!(FeedError::Connect("dns error: no such host".to_string()).should_retry());
    assert!(FeedError::ConnectTimeout.should_retry());
    assert!(FeedError::RequestTimeout.should_retry());

    // HTTP errors
    assert!(
        !FeedError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
            retriable: false
        }
        .should_retry()
    );
    assert!(
        FeedError::Http {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            retriable: true
        }
        .should_retry()
    );
}

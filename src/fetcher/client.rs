use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::fetcher::{errors::FeedError, pipeline::parse_feed, types::RawEntry};

const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const USER_AGENT: &str = "GazetteBot/0.1 (+https://gazette.example.com)";
const ACCEPT: &str = "application/rss+xml,application/atom+xml,application/feed+json,application/xml;q=0.9,text/xml;q=0.9,*/*;q=0.8";

/// Capability to download and parse one syndication feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_and_parse(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<RawEntry>, FeedError>;
}

/// HTTP feed fetcher. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct FeedClient {
    http: Client,
}

impl FeedClient {
    pub fn new() -> Result<Self, FeedError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));

        let http = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(headers)
            .build()
            .map_err(FeedError::from_reqwest_error)?;

        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    async fn download(&self, url: &str, timeout: Duration) -> Result<bytes::Bytes, FeedError> {
        let parsed_url = url::Url::parse(url)?;

        let response = self
            .http
            .get(parsed_url)
            .timeout(timeout)
            .send()
            .await
            .map_err(FeedError::from_reqwest_error)?;

        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(FeedError::BodyTooLarge(content_length));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Http {
                status,
                retriable: status.is_server_error(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("application/xml")
            .to_string();

        if is_binary_media(&content_type) {
            return Err(FeedError::UnsupportedContentType(content_type));
        }

        let body = response
            .bytes()
            .await
            .map_err(FeedError::from_reqwest_error)?;

        // Content-Length may have been missing or wrong
        if body.len() as u64 > MAX_BODY_SIZE {
            return Err(FeedError::BodyTooLarge(body.len() as u64));
        }

        Ok(body)
    }
}

#[async_trait]
impl FeedFetcher for FeedClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_and_parse(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<RawEntry>, FeedError> {
        let body = self.download(url, timeout).await?;
        let entries = parse_feed(&body)?;
        debug!(bytes = body.len(), entries = entries.len(), "parsed feed");
        Ok(entries)
    }
}

fn is_binary_media(content_type: &str) -> bool {
    let essence = content_type.trim().to_ascii_lowercase();
    ["image/", "audio/", "video/", "font/"]
        .iter()
        .any(|prefix| essence.starts_with(prefix))
}

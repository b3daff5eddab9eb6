#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use gazette::{
    entities::Article,
    fetcher::FeedClient,
    ingest::{IngestSettings, Ingestor},
    ranking::QueryEngine,
    repositories::InMemoryStore,
};

pub struct Item<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: &'a str,
    pub categories: &'a [&'a str],
}

impl<'a> Item<'a> {
    pub fn new(title: &'a str, link: &'a str) -> Self {
        Self {
            title,
            link,
            description: "",
            categories: &[],
        }
    }
}

/// Minimal RSS 2.0 document.
pub fn rss_feed(items: &[Item<'_>]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test feed</title><link>https://feed.example.com</link><description>Fixture</description>"#,
    );
    for item in items {
        body.push_str("<item>");
        body.push_str(&format!("<title>{}</title>", item.title));
        if !item.link.is_empty() {
            body.push_str(&format!("<link>{}</link>", item.link));
        }
        if !item.description.is_empty() {
            body.push_str(&format!(
                "<description><![CDATA[{}]]></description>",
                item.description
            ));
        }
        for category in item.categories {
            body.push_str(&format!("<category>{}</category>", category));
        }
        body.push_str("<pubDate>Tue, 10 Jun 2025 04:00:00 GMT</pubDate></item>");
    }
    body.push_str("</channel></rss>");
    body
}

pub fn ingestor(store: &InMemoryStore, settings: IngestSettings) -> Ingestor {
    Ingestor::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(FeedClient::new().unwrap()),
        settings,
    )
}

pub fn engine(store: &InMemoryStore) -> QueryEngine {
    QueryEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        std::time::Duration::from_secs(2),
    )
}

pub fn fast_settings() -> IngestSettings {
    IngestSettings {
        feed_timeout: std::time::Duration::from_secs(5),
        store_timeout: std::time::Duration::from_secs(2),
        concurrency: 2,
    }
}

/// Stored article with explicit ranking inputs.
pub fn article(
    title: &str,
    upvotes: i32,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
) -> Article {
    Article {
        id: Uuid::new_v4(),
        title: title.to_string(),
        url: format!("https://news.example.com/{}", Uuid::new_v4()),
        description: Some(format!("Summary of {}", title)),
        content: Some(format!("Full text of {}", title)),
        author: None,
        published_at,
        source_id: None,
        source_name: "Fixture".to_string(),
        image_url: None,
        reading_time_minutes: 1,
        upvotes,
        downvotes: 0,
        created_at,
        updated_at: created_at,
        tags: Vec::new(),
        is_bookmarked: false,
        user_vote: None,
    }
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::NewArticle,
    extractor::{normalize::word_count, reading_time_minutes, strip_markup},
    ingest::IngestError,
    repositories::{ArticleStore, bounded},
};

/// Reading time used when a submitted article has no description.
pub const DEFAULT_READING_TIME_MINUTES: i32 = 5;

/// Article submitted by an operator rather than read from a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewArticleRequest {
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Submitted {
    pub id: Uuid,
    pub inserted: bool,
}

#[instrument(skip(store, request), fields(url = %request.url))]
pub async fn submit_article(
    store: &dyn ArticleStore,
    request: NewArticleRequest,
    store_timeout: Duration,
) -> Result<Submitted, IngestError> {
    let title = required(&request.title, "title")?;
    let url = required(&request.url, "url")?;
    let source_name = required(&request.source_name, "source_name")?;

    let description = request
        .description
        .as_deref()
        .map(strip_markup)
        .filter(|d| !d.is_empty());
    let reading_time_minutes = match &description {
        Some(text) => reading_time_minutes(word_count(text)),
        None => DEFAULT_READING_TIME_MINUTES,
    };

    let article = NewArticle {
        title,
        url,
        description,
        content: None,
        author: non_blank(request.author),
        published_at: Some(Utc::now()),
        source_id: None,
        source_name,
        image_url: non_blank(request.image_url),
        reading_time_minutes,
        categories: Vec::new(),
    };

    let stored = bounded(store_timeout, store.insert_if_absent(&article)).await?;
    if stored.inserted && !request.tag_ids.is_empty() {
        bounded(
            store_timeout,
            store.associate_tags(stored.id, &request.tag_ids),
        )
        .await?;
    }

    info!(id = %stored.id, inserted = stored.inserted, "Manual article submitted");
    Ok(Submitted {
        id: stored.id,
        inserted: stored.inserted,
    })
}

fn required(value: &str, field: &str) -> Result<String, IngestError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IngestError::Invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{ArticleReader, InMemoryStore};

    fn request() -> NewArticleRequest {
        NewArticleRequest {
            title: "Hand picked".to_string(),
            url: "https://news.example.com/picked".to_string(),
            source_name: "Editors".to_string(),
            ..NewArticleRequest::default()
        }
    }

    #[tokio::test]
    async fn test_missing_title_is_rejected() {
        let store = InMemoryStore::new();
        let result = submit_article(
            &store,
            NewArticleRequest {
                title: "   ".to_string(),
                ..request()
            },
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(IngestError::Invalid(msg)) if msg.contains("title")));
        assert_eq!(store.article_count(), 0);
    }

    #[tokio::test]
    async fn test_reading_time_defaults_without_description() {
        let store = InMemoryStore::new();
        let submitted = submit_article(&store, request(), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(submitted.inserted);
        let article = store
            .article_by_url("https://news.example.com/picked")
            .unwrap();
        assert_eq!(article.reading_time_minutes, DEFAULT_READING_TIME_MINUTES);
        assert!(article.published_at.is_some());
    }

    #[tokio::test]
    async fn test_description_drives_reading_time_and_tags() {
        let store = InMemoryStore::new();
        let tag = store.add_tag("Editorial", "#333333");
        let body = vec!["word"; 600].join(" ");

        let submitted = submit_article(
            &store,
            NewArticleRequest {
                description: Some(format!("<p>{}</p>", body)),
                tag_ids: vec![tag.id],
                ..request()
            },
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let article = store
            .article_by_url("https://news.example.com/picked")
            .unwrap();
        assert_eq!(article.reading_time_minutes, 3);
        assert_eq!(article.description.as_deref(), Some(body.as_str()));

        let tags = store.tags_for(&[submitted.id]).await.unwrap();
        assert_eq!(tags[&submitted.id][0].id, tag.id);
    }

    #[tokio::test]
    async fn test_resubmitting_returns_existing_article() {
        let store = InMemoryStore::new();
        let first = submit_article(&store, request(), Duration::from_secs(1))
            .await
            .unwrap();
        let second = submit_article(&store, request(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(!second.inserted);
        assert_eq!(store.article_count(), 1);
    }
}

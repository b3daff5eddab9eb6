use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{Article, TagWithCount},
    ranking::query::{ArticleQuery, ListingRequest, clamp_trending_limit},
    repositories::{
        ArticleReader, OverlayStore, StoreError, TagStore, bounded, tag::DEFAULT_POPULAR_TAGS,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingResult {
    pub articles: Vec<Article>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub has_more: bool,
}

/// Filtered, ranked and paginated reads over the article store.
#[derive(Clone)]
pub struct QueryEngine {
    articles: Arc<dyn ArticleReader>,
    overlay: Arc<dyn OverlayStore>,
    tags: Arc<dyn TagStore>,
    store_timeout: Duration,
}

impl QueryEngine {
    pub fn new(
        articles: Arc<dyn ArticleReader>,
        overlay: Arc<dyn OverlayStore>,
        tags: Arc<dyn TagStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            articles,
            overlay,
            tags,
            store_timeout,
        }
    }

    #[instrument(skip(self, request), fields(sort = ?request.sort, page = request.page))]
    pub async fn list(
        &self,
        request: ListingRequest,
        user_id: Option<Uuid>,
    ) -> Result<ListingResult, StoreError> {
        let request = request.normalized();
        let query = ArticleQuery::for_listing(&request, Utc::now());

        let total_count = bounded(self.store_timeout, self.articles.count(&query)).await?;
        let mut articles = bounded(self.store_timeout, self.articles.fetch(&query)).await?;
        debug!(total_count, returned = articles.len(), "listing query finished");

        self.enrich(&mut articles, user_id).await;

        Ok(ListingResult {
            articles,
            total_count,
            page: request.page,
            page_size: request.page_size,
            has_more: request.has_more(total_count),
        })
    }

    /// Best-scoring articles created within the trending window.
    #[instrument(skip(self))]
    pub async fn trending_top(
        &self,
        limit: i64,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Article>, StoreError> {
        let query = ArticleQuery::trending_window(Utc::now(), clamp_trending_limit(limit));
        let mut articles = bounded(self.store_timeout, self.articles.fetch(&query)).await?;

        self.enrich(&mut articles, user_id).await;
        Ok(articles)
    }

    /// One article with its full content.
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid, user_id: Option<Uuid>) -> Result<Option<Article>, StoreError> {
        let Some(article) = bounded(self.store_timeout, self.articles.find_by_id(id)).await? else {
            return Ok(None);
        };

        let mut rows = vec![article];
        self.enrich(&mut rows, user_id).await;
        Ok(rows.pop())
    }

    pub async fn tags(&self) -> Result<Vec<TagWithCount>, StoreError> {
        bounded(self.store_timeout, self.tags.list_with_counts()).await
    }

    pub async fn popular_tags(&self, limit: Option<i64>) -> Result<Vec<TagWithCount>, StoreError> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_POPULAR_TAGS);
        bounded(self.store_timeout, self.tags.popular(limit)).await
    }

    /// Tag hydration and user overlay. Both degrade to bare rows on failure.
    async fn enrich(&self, articles: &mut [Article], user_id: Option<Uuid>) {
        if articles.is_empty() {
            return;
        }
        let ids: Vec<Uuid> = articles.iter().map(|a| a.id).collect();

        match bounded(self.store_timeout, self.articles.tags_for(&ids)).await {
            Ok(mut by_article) => {
                for article in articles.iter_mut() {
                    article.tags = by_article.remove(&article.id).unwrap_or_default();
                }
            }
            Err(e) => warn!("Tag hydration failed, returning articles without tags: {}", e),
        }

        let Some(user_id) = user_id else {
            return;
        };
        match bounded(self.store_timeout, self.overlay.overlay(user_id, &ids)).await {
            Ok(overlay) => articles.iter_mut().for_each(|a| overlay.apply(a)),
            Err(e) => warn!(%user_id, "Overlay lookup failed, returning unannotated articles: {}", e),
        }
    }
}

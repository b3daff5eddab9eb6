use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::warn;
use uuid::Uuid;

use crate::{
    entities::{UserOverlay, VoteDirection},
    repositories::StoreError,
};

/// Bookmark and vote state of one user over a batch of articles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverlayStore: Send + Sync {
    async fn overlay(&self, user_id: Uuid, article_ids: &[Uuid])
    -> Result<UserOverlay, StoreError>;
}

#[derive(Clone)]
pub struct PgOverlayStore {
    pool: Pool<Postgres>,
}

impl PgOverlayStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OverlayStore for PgOverlayStore {
    async fn overlay(
        &self,
        user_id: Uuid,
        article_ids: &[Uuid],
    ) -> Result<UserOverlay, StoreError> {
        let mut overlay = UserOverlay::default();
        if article_ids.is_empty() {
            return Ok(overlay);
        }
        let ids = article_ids.to_vec();

        let rows: Vec<(Uuid, bool, Option<String>)> = sqlx::query_as(
            r#"
            SELECT ids.article_id, b.article_id IS NOT NULL, v.vote_type
            FROM UNNEST($2::uuid[]) AS ids (article_id)
            LEFT JOIN bookmarks b ON b.article_id = ids.article_id AND b.user_id = $1
            LEFT JOIN votes v ON v.article_id = ids.article_id AND v.user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for (article_id, bookmarked, vote_type) in rows {
            if bookmarked {
                overlay.bookmarked.insert(article_id);
            }
            let Some(vote_type) = vote_type else {
                continue;
            };
            match vote_type.parse::<VoteDirection>() {
                Ok(direction) => {
                    overlay.votes.insert(article_id, direction);
                }
                Err(e) => warn!(%article_id, "ignoring vote row: {}", e),
            }
        }

        Ok(overlay)
    }
}

use async_trait::async_trait;
use regex::Regex;
use sqlx::{Pool, Postgres};
use std::sync::LazyLock;

use crate::{
    entities::{Tag, TagWithCount},
    repositories::StoreError,
};

pub const DEFAULT_POPULAR_TAGS: i64 = 10;

static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercase, ASCII-alphanumeric words joined by `-`.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn find_by_slugs(&self, slugs: &[String]) -> Result<Vec<Tag>, StoreError>;
    /// Every tag with its article count, by name.
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, StoreError>;
    /// Most used tags first.
    async fn popular(&self, limit: i64) -> Result<Vec<TagWithCount>, StoreError>;
}

#[derive(Clone)]
pub struct PgTagStore {
    pool: Pool<Postgres>,
}

impl PgTagStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagStore for PgTagStore {
    async fn find_by_slugs(&self, slugs: &[String]) -> Result<Vec<Tag>, StoreError> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let tags = sqlx::query_as::<_, Tag>(
            "SELECT id, name, slug, color, created_at FROM tags WHERE slug = ANY($1)",
        )
        .bind(slugs.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, StoreError> {
        let tags = sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, t.slug, t.color, t.created_at,
                   (SELECT COUNT(*) FROM article_tags at WHERE at.tag_id = t.id) AS article_count
            FROM tags t
            ORDER BY t.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn popular(&self, limit: i64) -> Result<Vec<TagWithCount>, StoreError> {
        let tags = sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, t.slug, t.color, t.created_at,
                   COUNT(at.article_id) AS article_count
            FROM tags t
            LEFT JOIN article_tags at ON at.tag_id = t.id
            GROUP BY t.id
            ORDER BY article_count DESC, t.name ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }
}

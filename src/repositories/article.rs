use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    entities::{Article, NewArticle, Tag},
    ranking::query::ArticleQuery,
    repositories::StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub id: Uuid,
    /// `false` when an article with the same URL already existed.
    pub inserted: bool,
}

/// Write side used by ingestion. `insert_if_absent` must be safe under
/// concurrent callers racing on the same URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn exists_by_url(&self, url: &str) -> Result<bool, StoreError>;
    async fn insert_if_absent(&self, article: &NewArticle) -> Result<InsertOutcome, StoreError>;
    async fn associate_tags(&self, article_id: Uuid, tag_ids: &[Uuid]) -> Result<(), StoreError>;
}

/// Read side used by the ranking engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArticleReader: Send + Sync {
    async fn count(&self, query: &ArticleQuery) -> Result<i64, StoreError>;
    async fn fetch(&self, query: &ArticleQuery) -> Result<Vec<Article>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, StoreError>;
    async fn tags_for(&self, article_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>, StoreError>;
}

#[derive(FromRow)]
struct ArticleTagRow {
    article_id: Uuid,
    #[sqlx(flatten)]
    tag: Tag,
}

#[derive(Clone)]
pub struct PgArticleStore {
    pool: Pool<Postgres>,
}

impl PgArticleStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn exists_by_url(&self, url: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE url = $1)")
                .bind(url)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn insert_if_absent(&self, article: &NewArticle) -> Result<InsertOutcome, StoreError> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO articles
                  (title, url, description, content, author, published_at,
                   source_id, source_name, image_url, reading_time_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (url) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.description)
        .bind(&article.content)
        .bind(&article.author)
        .bind(article.published_at)
        .bind(article.source_id)
        .bind(&article.source_name)
        .bind(&article.image_url)
        .bind(article.reading_time_minutes)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(InsertOutcome { id, inserted: true });
        }

        // Lost the race (or the URL was already known); report the winner's id
        let id: Uuid = sqlx::query_scalar("SELECT id FROM articles WHERE url = $1")
            .bind(&article.url)
            .fetch_one(&self.pool)
            .await?;

        Ok(InsertOutcome {
            id,
            inserted: false,
        })
    }

    async fn associate_tags(&self, article_id: Uuid, tag_ids: &[Uuid]) -> Result<(), StoreError> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO article_tags (article_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS tag_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(article_id)
        .bind(tag_ids.to_vec())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ArticleReader for PgArticleStore {
    async fn count(&self, query: &ArticleQuery) -> Result<i64, StoreError> {
        let mut qb = query.count_sql();
        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    async fn fetch(&self, query: &ArticleQuery) -> Result<Vec<Article>, StoreError> {
        let mut qb = query.select_sql();
        let articles = qb
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await?;

        Ok(articles)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, StoreError> {
        let article = sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, url, description, content, author, published_at,
                   source_id, source_name, image_url, reading_time_minutes,
                   upvotes, downvotes, created_at, updated_at
            FROM articles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(article)
    }

    async fn tags_for(&self, article_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>, StoreError> {
        if article_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, ArticleTagRow>(
            r#"
            SELECT at.article_id, t.id, t.name, t.slug, t.color, t.created_at
            FROM article_tags at
            JOIN tags t ON t.id = at.tag_id
            WHERE at.article_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(article_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut by_article: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_article.entry(row.article_id).or_default().push(row.tag);
        }
        Ok(by_article)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    entities::{NewSource, Source},
    repositories::StoreError,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Source>, StoreError>;
    async fn mark_fetched(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
    async fn create(&self, source: NewSource) -> Result<Source, StoreError>;
    async fn list_all(&self) -> Result<Vec<Source>, StoreError>;
}

#[derive(Clone)]
pub struct PgSourceStore {
    pool: Pool<Postgres>,
}

impl PgSourceStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceStore for PgSourceStore {
    async fn list_active(&self) -> Result<Vec<Source>, StoreError> {
        let sources = sqlx::query_as::<_, Source>(
            r#"
            SELECT id, name, url, favicon_url, active, last_fetched_at, created_at
            FROM rss_sources
            WHERE active = TRUE
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sources)
    }

    async fn mark_fetched(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE rss_sources SET last_fetched_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create(&self, source: NewSource) -> Result<Source, StoreError> {
        let source = sqlx::query_as::<_, Source>(
            r#"
            INSERT INTO rss_sources (name, url, favicon_url)
            VALUES ($1, $2, $3)
            RETURNING id, name, url, favicon_url, active, last_fetched_at, created_at
            "#,
        )
        .bind(source.name)
        .bind(source.url)
        .bind(source.favicon_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(source)
    }

    async fn list_all(&self) -> Result<Vec<Source>, StoreError> {
        let sources = sqlx::query_as::<_, Source>(
            r#"
            SELECT id, name, url, favicon_url, active, last_fetched_at, created_at
            FROM rss_sources
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sources)
    }
}

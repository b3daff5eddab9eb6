//! In-process implementation of every store trait.
//!
//! Used by the integration tests and handy for running ingestion without a
//! database. URL uniqueness goes through `DashMap::entry`, so concurrent
//! `insert_if_absent` calls for one URL still produce a single article.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet, mapref::entry::Entry};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use uuid::Uuid;

use crate::{
    entities::{Article, NewArticle, NewSource, Source, Tag, TagWithCount, UserOverlay, VoteDirection},
    ranking::query::ArticleQuery,
    repositories::{
        ArticleReader, ArticleStore, InsertOutcome, OverlayStore, SourceStore, StoreError,
        TagStore, tag::slugify,
    },
};

#[derive(Default)]
struct Inner {
    sources: DashMap<Uuid, Source>,
    articles: DashMap<Uuid, Article>,
    urls: DashMap<String, Uuid>,
    tags: DashMap<Uuid, Tag>,
    article_tags: DashMap<Uuid, HashSet<Uuid>>,
    bookmarks: DashSet<(Uuid, Uuid)>,
    votes: DashMap<(Uuid, Uuid), VoteDirection>,
    unavailable: AtomicBool,
    overlay_unavailable: AtomicBool,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only overlay lookups fail.
    pub fn set_overlay_unavailable(&self, unavailable: bool) {
        self.inner
            .overlay_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    pub fn add_source(&self, name: &str, url: &str, active: bool) -> Source {
        let source = Source {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: url.to_string(),
            favicon_url: None,
            active,
            last_fetched_at: None,
            created_at: Utc::now(),
        };
        self.inner.sources.insert(source.id, source.clone());
        source
    }

    pub fn source(&self, id: Uuid) -> Option<Source> {
        self.inner.sources.get(&id).map(|s| s.clone())
    }

    /// Store a fully formed article as-is, keeping its id, counts and timestamps.
    pub fn seed_article(&self, article: Article) {
        self.inner.urls.insert(article.url.clone(), article.id);
        self.inner.articles.insert(article.id, article);
    }

    pub fn article_by_url(&self, url: &str) -> Option<Article> {
        let id = *self.inner.urls.get(url)?;
        self.inner.articles.get(&id).map(|a| a.clone())
    }

    pub fn article_count(&self) -> usize {
        self.inner.articles.len()
    }

    pub fn add_tag(&self, name: &str, color: &str) -> Tag {
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            color: color.to_string(),
            created_at: Utc::now(),
        };
        self.inner.tags.insert(tag.id, tag.clone());
        tag
    }

    pub fn tag_article(&self, article_id: Uuid, tag_id: Uuid) {
        self.inner
            .article_tags
            .entry(article_id)
            .or_default()
            .insert(tag_id);
    }

    pub fn bookmark(&self, user_id: Uuid, article_id: Uuid) {
        self.inner.bookmarks.insert((user_id, article_id));
    }

    /// Record a user's vote. Article counters are left to the caller.
    pub fn vote(&self, user_id: Uuid, article_id: Uuid, direction: VoteDirection) {
        self.inner.votes.insert((user_id, article_id), direction);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn tags_of(&self, article_id: Uuid) -> Vec<Tag> {
        let Some(tag_ids) = self.inner.article_tags.get(&article_id) else {
            return Vec::new();
        };
        let mut tags: Vec<Tag> = tag_ids
            .iter()
            .filter_map(|id| self.inner.tags.get(id).map(|t| t.clone()))
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn matching(&self, query: &ArticleQuery) -> Vec<Article> {
        self.inner
            .articles
            .iter()
            .filter(|entry| {
                let slugs: Vec<String> = self
                    .tags_of(*entry.key())
                    .into_iter()
                    .map(|t| t.slug)
                    .collect();
                query.matches(entry.value(), &slugs)
            })
            .map(|entry| {
                let mut article = entry.value().clone();
                article.content = None;
                article
            })
            .collect()
    }

    fn tag_counts(&self) -> Vec<TagWithCount> {
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for entry in self.inner.article_tags.iter() {
            for tag_id in entry.value() {
                *counts.entry(*tag_id).or_default() += 1;
            }
        }

        self.inner
            .tags
            .iter()
            .map(|tag| TagWithCount {
                tag: tag.clone(),
                article_count: counts.get(tag.key()).copied().unwrap_or(0),
            })
            .collect()
    }
}

#[async_trait]
impl SourceStore for InMemoryStore {
    async fn list_active(&self) -> Result<Vec<Source>, StoreError> {
        self.check()?;
        let mut sources: Vec<Source> = self
            .inner
            .sources
            .iter()
            .filter(|s| s.active)
            .map(|s| s.clone())
            .collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }

    async fn mark_fetched(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check()?;
        if let Some(mut source) = self.inner.sources.get_mut(&id) {
            source.last_fetched_at = Some(at);
        }
        Ok(())
    }

    async fn create(&self, source: NewSource) -> Result<Source, StoreError> {
        self.check()?;
        let mut created = self.add_source(&source.name, &source.url, true);
        created.favicon_url = source.favicon_url;
        self.inner.sources.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_all(&self) -> Result<Vec<Source>, StoreError> {
        self.check()?;
        let mut sources: Vec<Source> = self.inner.sources.iter().map(|s| s.clone()).collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }
}

#[async_trait]
impl ArticleStore for InMemoryStore {
    async fn exists_by_url(&self, url: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.inner.urls.contains_key(url))
    }

    async fn insert_if_absent(&self, article: &NewArticle) -> Result<InsertOutcome, StoreError> {
        self.check()?;
        match self.inner.urls.entry(article.url.clone()) {
            Entry::Occupied(existing) => Ok(InsertOutcome {
                id: *existing.get(),
                inserted: false,
            }),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let id = Uuid::new_v4();
                self.inner.articles.insert(
                    id,
                    Article {
                        id,
                        title: article.title.clone(),
                        url: article.url.clone(),
                        description: article.description.clone(),
                        content: article.content.clone(),
                        author: article.author.clone(),
                        published_at: article.published_at,
                        source_id: article.source_id,
                        source_name: article.source_name.clone(),
                        image_url: article.image_url.clone(),
                        reading_time_minutes: article.reading_time_minutes,
                        upvotes: 0,
                        downvotes: 0,
                        created_at: now,
                        updated_at: now,
                        tags: Vec::new(),
                        is_bookmarked: false,
                        user_vote: None,
                    },
                );
                slot.insert(id);
                Ok(InsertOutcome { id, inserted: true })
            }
        }
    }

    async fn associate_tags(&self, article_id: Uuid, tag_ids: &[Uuid]) -> Result<(), StoreError> {
        self.check()?;
        for tag_id in tag_ids {
            self.tag_article(article_id, *tag_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleReader for InMemoryStore {
    async fn count(&self, query: &ArticleQuery) -> Result<i64, StoreError> {
        self.check()?;
        Ok(self.matching(query).len() as i64)
    }

    async fn fetch(&self, query: &ArticleQuery) -> Result<Vec<Article>, StoreError> {
        self.check()?;
        let mut rows = self.matching(query);
        rows.sort_by(|a, b| query.compare(a, b));

        if let Some(page) = query.page() {
            let offset = page.offset.max(0) as usize;
            let limit = page.limit.max(0) as usize;
            rows = rows.into_iter().skip(offset).take(limit).collect();
        }
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, StoreError> {
        self.check()?;
        Ok(self.inner.articles.get(&id).map(|a| a.clone()))
    }

    async fn tags_for(&self, article_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>, StoreError> {
        self.check()?;
        Ok(article_ids
            .iter()
            .map(|id| (*id, self.tags_of(*id)))
            .filter(|(_, tags)| !tags.is_empty())
            .collect())
    }
}

#[async_trait]
impl OverlayStore for InMemoryStore {
    async fn overlay(
        &self,
        user_id: Uuid,
        article_ids: &[Uuid],
    ) -> Result<UserOverlay, StoreError> {
        self.check()?;
        if self.inner.overlay_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("overlay lookup disabled".to_string()));
        }

        let mut overlay = UserOverlay::default();
        for id in article_ids {
            if self.inner.bookmarks.contains(&(user_id, *id)) {
                overlay.bookmarked.insert(*id);
            }
            if let Some(direction) = self.inner.votes.get(&(user_id, *id)) {
                overlay.votes.insert(*id, *direction);
            }
        }
        Ok(overlay)
    }
}

#[async_trait]
impl TagStore for InMemoryStore {
    async fn find_by_slugs(&self, slugs: &[String]) -> Result<Vec<Tag>, StoreError> {
        self.check()?;
        Ok(self
            .inner
            .tags
            .iter()
            .filter(|t| slugs.contains(&t.slug))
            .map(|t| t.clone())
            .collect())
    }

    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, StoreError> {
        self.check()?;
        let mut tags = self.tag_counts();
        tags.sort_by(|a, b| a.tag.name.cmp(&b.tag.name));
        Ok(tags)
    }

    async fn popular(&self, limit: i64) -> Result<Vec<TagWithCount>, StoreError> {
        self.check()?;
        let mut tags = self.tag_counts();
        tags.sort_by(|a, b| {
            b.article_count
                .cmp(&a.article_count)
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });
        tags.truncate(limit.max(0) as usize);
        Ok(tags)
    }
}

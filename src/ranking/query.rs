//! Listing requests and the typed article query they compile to.
//!
//! An [`ArticleQuery`] is a plain value: a list of predicates, an ordering
//! and an optional page window. The Postgres reader renders it through
//! `sqlx::QueryBuilder`, which numbers placeholders as values are bound, and
//! the in-memory store evaluates the very same value with [`ArticleQuery::matches`]
//! and [`ArticleQuery::compare`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use std::{cmp::Ordering, str::FromStr};

use crate::{entities::Article, ranking::score::trending_score};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 50;
pub const DEFAULT_TRENDING_LIMIT: i64 = 10;
pub const MAX_TRENDING_LIMIT: i64 = 50;
pub const TRENDING_WINDOW_DAYS: i64 = 7;

/// Columns of a listing row. Full content is only loaded for single-article reads.
const LISTING_COLUMNS: &str = "a.id, a.title, a.url, a.description, NULL::text AS content, \
     a.author, a.published_at, a.source_id, a.source_name, a.image_url, \
     a.reading_time_minutes, a.upvotes, a.downvotes, a.created_at, a.updated_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Newest,
    Popular,
    Trending,
}

impl SortMode {
    /// Unknown names fall back to `newest`.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(SortMode::Newest),
            "popular" => Ok(SortMode::Popular),
            "trending" => Ok(SortMode::Trending),
            other => Err(format!("unknown sort mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingRequest {
    pub page: i64,
    pub page_size: i64,
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub sort: SortMode,
}

impl Default for ListingRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            tags: Vec::new(),
            sort: SortMode::Newest,
        }
    }
}

impl ListingRequest {
    /// Clamp pagination and drop blank filters. Never rejects.
    pub fn normalized(self) -> Self {
        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        Self {
            page: clamp_page(self.page),
            page_size: clamp_page_size(self.page_size),
            search,
            tags,
            sort: self.sort,
        }
    }

    /// Rows skipped before this page. Saturates for huge page numbers.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Whether rows remain after this page, given the filtered total.
    pub fn has_more(&self, total_count: i64) -> bool {
        total_count > self.page.saturating_mul(self.page_size)
    }
}

pub fn clamp_page(page: i64) -> i64 {
    if page < 1 { DEFAULT_PAGE } else { page }
}

pub fn clamp_page_size(page_size: i64) -> i64 {
    if (1..=MAX_PAGE_SIZE).contains(&page_size) {
        page_size
    } else {
        DEFAULT_PAGE_SIZE
    }
}

pub fn clamp_trending_limit(limit: i64) -> i64 {
    if (1..=MAX_TRENDING_LIMIT).contains(&limit) {
        limit
    } else {
        DEFAULT_TRENDING_LIMIT
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Article carries at least one tag with one of these slugs.
    TagSlugs(Vec<String>),
    /// Case-insensitive substring of title or description.
    Search(String),
    CreatedSince(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortOrder {
    Newest,
    Popular,
    Trending { now: DateTime<Utc> },
}

impl SortOrder {
    pub fn from_mode(mode: SortMode, now: DateTime<Utc>) -> Self {
        match mode {
            SortMode::Newest => SortOrder::Newest,
            SortMode::Popular => SortOrder::Popular,
            SortMode::Trending => SortOrder::Trending { now },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleQuery {
    predicates: Vec<Predicate>,
    order: SortOrder,
    page: Option<Page>,
}

impl ArticleQuery {
    pub fn new(order: SortOrder) -> Self {
        Self {
            predicates: Vec::new(),
            order,
            page: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.page = Some(Page { limit, offset });
        self
    }

    /// Filters, ordering and window for a (normalized) listing request.
    pub fn for_listing(request: &ListingRequest, now: DateTime<Utc>) -> Self {
        let mut query = ArticleQuery::new(SortOrder::from_mode(request.sort, now));
        if !request.tags.is_empty() {
            query = query.filter(Predicate::TagSlugs(request.tags.clone()));
        }
        if let Some(term) = &request.search {
            query = query.filter(Predicate::Search(term.clone()));
        }
        query.paginate(request.page_size, request.offset())
    }

    /// Articles created in the trending window, best score first.
    pub fn trending_window(now: DateTime<Utc>, limit: i64) -> Self {
        ArticleQuery::new(SortOrder::Trending { now })
            .filter(Predicate::CreatedSince(
                now - Duration::days(TRENDING_WINDOW_DAYS),
            ))
            .paginate(limit, 0)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn page(&self) -> Option<Page> {
        self.page
    }

    /// `SELECT COUNT(*)` over the filtered set, ignoring order and window.
    pub fn count_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM articles a");
        self.push_where(&mut qb);
        qb
    }

    /// Filtered, ordered, windowed listing rows.
    pub fn select_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(LISTING_COLUMNS).push(" FROM articles a");
        self.push_where(&mut qb);
        self.push_order(&mut qb);
        if let Some(page) = self.page {
            qb.push(" LIMIT ").push_bind(page.limit);
            qb.push(" OFFSET ").push_bind(page.offset);
        }
        qb
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match predicate {
                Predicate::TagSlugs(slugs) => {
                    qb.push(
                        "EXISTS (SELECT 1 FROM article_tags at JOIN tags t ON t.id = at.tag_id \
                         WHERE at.article_id = a.id AND t.slug = ANY(",
                    );
                    qb.push_bind(slugs.clone());
                    qb.push("))");
                }
                Predicate::Search(term) => {
                    let pattern = format!("%{}%", escape_like(term));
                    qb.push("(a.title ILIKE ");
                    qb.push_bind(pattern.clone());
                    qb.push(" OR a.description ILIKE ");
                    qb.push_bind(pattern);
                    qb.push(")");
                }
                Predicate::CreatedSince(since) => {
                    qb.push("a.created_at > ");
                    qb.push_bind(*since);
                }
            }
        }
    }

    fn push_order(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self.order {
            SortOrder::Newest => {
                qb.push(" ORDER BY a.published_at DESC NULLS LAST, a.created_at DESC, a.id DESC");
            }
            SortOrder::Popular => {
                qb.push(" ORDER BY a.upvotes DESC, a.created_at DESC, a.id DESC");
            }
            SortOrder::Trending { now } => {
                qb.push(" ORDER BY (a.upvotes::float8 / (GREATEST(EXTRACT(EPOCH FROM (");
                qb.push_bind(now);
                qb.push(
                    "::timestamptz - a.created_at))::float8, 0) / 3600.0 + 1.0)) DESC, \
                     a.created_at DESC, a.id DESC",
                );
            }
        }
    }

    /// In-memory evaluation of the predicates. `tag_slugs` are the article's tags.
    pub fn matches(&self, article: &Article, tag_slugs: &[String]) -> bool {
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::TagSlugs(slugs) => tag_slugs.iter().any(|slug| slugs.contains(slug)),
            Predicate::Search(term) => {
                let needle = term.to_lowercase();
                article.title.to_lowercase().contains(&needle)
                    || article
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            Predicate::CreatedSince(since) => article.created_at > *since,
        })
    }

    /// In-memory ordering, identical in intent to the SQL `ORDER BY`.
    pub fn compare(&self, a: &Article, b: &Article) -> Ordering {
        let primary = match self.order {
            SortOrder::Newest => match (a.published_at, b.published_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortOrder::Popular => b.upvotes.cmp(&a.upvotes),
            SortOrder::Trending { now } => {
                let score_a = trending_score(a.upvotes, a.created_at, now);
                let score_b = trending_score(b.upvotes, b.created_at, now);
                score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
            }
        };

        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// Escape `LIKE` wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

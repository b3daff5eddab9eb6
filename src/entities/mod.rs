use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
};
use uuid::Uuid;

/// --- Enums ---

/// Direction of a user's vote. Stored as `text` in the `votes` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            other => Err(format!("unknown vote direction '{}'", other)),
        }
    }
}

/// --- Tables ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub favicon_url: Option<String>,
    pub active: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Source {
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            id: self.id,
            name: self.name.clone(),
            favicon_url: self.favicon_url.clone(),
        }
    }
}

/// The slice of a source the extractor stamps onto every article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub id: Uuid,
    pub name: String,
    pub favicon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub url: String,
    pub favicon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_id: Option<Uuid>,
    pub source_name: String,
    pub image_url: Option<String>,
    pub reading_time_minutes: i32,
    pub upvotes: i32,
    pub downvotes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[sqlx(skip)]
    #[serde(default)]
    pub is_bookmarked: bool,
    #[sqlx(skip)]
    #[serde(default)]
    pub user_vote: Option<VoteDirection>,
}

/// Candidate article produced from a feed entry, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_id: Option<Uuid>,
    pub source_name: String,
    pub image_url: Option<String>,
    pub reading_time_minutes: i32,
    /// Category names carried by the feed entry, matched against tag slugs.
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TagWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tag: Tag,
    pub article_count: i64,
}

/// Per-user annotations for a batch of articles. Read-only input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserOverlay {
    pub bookmarked: HashSet<Uuid>,
    pub votes: HashMap<Uuid, VoteDirection>,
}

impl UserOverlay {
    pub fn apply(&self, article: &mut Article) {
        article.is_bookmarked = self.bookmarked.contains(&article.id);
        article.user_vote = self.votes.get(&article.id).copied();
    }
}

//! Blog post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SortOrder;

/// Blog post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    /// Markdown source
    pub content: String,
    /// Rendered HTML
    pub content_html: String,
    pub author_id: Option<i64>,
    pub published: bool,
    /// Set the first time the post is published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a blog post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBlogInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    /// Derived from the content when empty
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub published: bool,
}

impl CreateBlogInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    pub fn with_author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }
}

/// Input for updating a blog post; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBlogInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author_id: Option<i64>,
    pub published: Option<bool>,
}

impl UpdateBlogInput {
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.slug.is_some()
            || self.excerpt.is_some()
            || self.content.is_some()
            || self.author_id.is_some()
            || self.published.is_some()
    }
}

/// Filters for blog list queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogFilter {
    /// Substring match on title, excerpt and content
    pub search: Option<String>,
    pub author_id: Option<i64>,
    /// Hide drafts (public listing)
    pub published_only: bool,
    pub sort: SortOrder,
}

impl BlogFilter {
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Default::default()
        }
    }
}

//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment left on a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub document_id: i64,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Comment joined with its document, for the admin overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithDocument {
    #[serde(flatten)]
    pub comment: Comment,
    pub document_title: String,
    pub document_slug: String,
}

/// Input for posting a comment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub name: String,
    pub content: String,
}

impl CreateCommentInput {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

//! Author model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blog post author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an author
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAuthorInput {
    pub name: String,
    /// Derived from the name when omitted
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl CreateAuthorInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }
}

/// Input for updating an author; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAuthorInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

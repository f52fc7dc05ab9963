//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - validate and normalise input
//! - allocate unique slugs
//! - keep the read cache coherent with writes
//! - run the quiz session flow

pub mod author;
pub mod blog;
pub mod comment;
pub mod dashboard;
pub mod document;
pub mod feedback;
pub mod markdown;
pub mod quiz;
pub mod quiz_session;
pub mod seed;
pub mod slug;

pub use author::{AuthorService, AuthorServiceError};
pub use blog::{BlogService, BlogServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use dashboard::{BlogCounts, DashboardService, DashboardStats};
pub use document::{DocumentService, DocumentServiceError};
pub use feedback::{FeedbackService, FeedbackServiceError};
pub use markdown::MarkdownRenderer;
pub use quiz::{QuizService, QuizServiceError};
pub use quiz_session::{sample_questions, score_answers};
pub use seed::{SeedReport, SeedService};
pub use slug::generate_slug;

use crate::cache::{Cache, CacheLayer};

/// Key patterns of every cached content read
pub const CONTENT_CACHE_PATTERNS: [&str; 8] = [
    "author:*",
    "authors:*",
    "blog:*",
    "blogs:*",
    "document:*",
    "documents:*",
    "quiz:*",
    "quizzes:*",
];

/// Drop cached entries matching any of `patterns`.
///
/// A write has already succeeded when this runs, so failures are logged
/// rather than returned.
pub(crate) async fn invalidate(cache: &Cache, patterns: &[&str]) {
    for pattern in patterns {
        if let Err(e) = cache.delete_pattern(pattern).await {
            tracing::warn!("Failed to invalidate cache pattern {}: {}", pattern, e);
        }
    }
}

/// Read a cached value. A failed read counts as a miss.
pub(crate) async fn cached<T>(cache: &Cache, key: &str) -> Option<T>
where
    T: serde::de::DeserializeOwned + Send,
{
    match cache.get::<T>(key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Cache read failed for {}: {}", key, e);
            None
        }
    }
}

/// Store a value under the cache's default TTL, logging failures
pub(crate) async fn store<T>(cache: &Cache, key: &str, value: &T)
where
    T: serde::Serialize + Send + Sync,
{
    if let Err(e) = cache.set(key, value, cache.default_ttl()).await {
        tracing::warn!("Cache write failed for {}: {}", key, e);
    }
}

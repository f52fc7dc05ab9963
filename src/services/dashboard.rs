//! Admin dashboard statistics

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{CommentWithDocument, Feedback, FeedbackCounts, ListParams};
use crate::services::{BlogService, CommentService, DocumentService, FeedbackService, QuizService};

/// How many recent feedback entries and comments the dashboard shows
const RECENT_ITEMS: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogCounts {
    pub published: i64,
    pub drafts: i64,
}

/// Site-wide totals plus the latest activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub blogs: BlogCounts,
    pub documents: i64,
    pub quizzes: i64,
    pub questions: i64,
    pub comments: i64,
    pub feedback: FeedbackCounts,
    pub recent_feedback: Vec<Feedback>,
    pub recent_comments: Vec<CommentWithDocument>,
}

pub struct DashboardService {
    blogs: Arc<BlogService>,
    documents: Arc<DocumentService>,
    quizzes: Arc<QuizService>,
    comments: Arc<CommentService>,
    feedback: Arc<FeedbackService>,
}

impl DashboardService {
    pub fn new(
        blogs: Arc<BlogService>,
        documents: Arc<DocumentService>,
        quizzes: Arc<QuizService>,
        comments: Arc<CommentService>,
        feedback: Arc<FeedbackService>,
    ) -> Self {
        Self {
            blogs,
            documents,
            quizzes,
            comments,
            feedback,
        }
    }

    /// Gather the dashboard figures. The counts are read independently, not
    /// as one snapshot.
    pub async fn stats(&self) -> anyhow::Result<DashboardStats> {
        let recent = ListParams::new(1, RECENT_ITEMS);

        let (published, drafts, documents, quizzes, questions, comments) = tokio::try_join!(
            async { Ok::<_, anyhow::Error>(self.blogs.count_published().await?) },
            async { Ok::<_, anyhow::Error>(self.blogs.count_drafts().await?) },
            async { Ok::<_, anyhow::Error>(self.documents.count().await?) },
            async { Ok::<_, anyhow::Error>(self.quizzes.count().await?) },
            async { Ok::<_, anyhow::Error>(self.quizzes.count_questions().await?) },
            async { Ok::<_, anyhow::Error>(self.comments.count().await?) },
        )?;
        let (feedback, recent_feedback, recent_comments) = tokio::try_join!(
            async { Ok::<_, anyhow::Error>(self.feedback.counts().await?) },
            async { Ok::<_, anyhow::Error>(self.feedback.list(None, &recent).await?.items) },
            async { Ok::<_, anyhow::Error>(self.comments.list_recent(&recent).await?.items) },
        )?;

        Ok(DashboardStats {
            blogs: BlogCounts { published, drafts },
            documents,
            quizzes,
            questions,
            comments,
            feedback,
            recent_feedback,
            recent_comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, QuizConfig};
    use crate::db::repositories::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateBlogInput, CreateCommentInput, CreateDocumentInput, CreateFeedbackInput};
    use crate::services::MarkdownRenderer;

    #[tokio::test]
    async fn test_stats_reflect_content() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default());

        let blogs = Arc::new(BlogService::new(
            SqlxBlogRepository::boxed(pool.clone()),
            SqlxAuthorRepository::boxed(pool.clone()),
            cache.clone(),
            MarkdownRenderer::new(),
        ));
        let documents = Arc::new(DocumentService::new(
            SqlxDocumentRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let quizzes = Arc::new(QuizService::new(
            SqlxQuizRepository::boxed(pool.clone()),
            cache.clone(),
            QuizConfig::default(),
        ));
        let comments = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxDocumentRepository::boxed(pool.clone()),
        ));
        let feedback = Arc::new(FeedbackService::new(SqlxFeedbackRepository::boxed(pool.clone())));

        blogs.create(CreateBlogInput::new("Live", "x").published()).await.unwrap();
        blogs.create(CreateBlogInput::new("Draft", "x")).await.unwrap();
        documents
            .create(CreateDocumentInput::new("Doc", "/files/doc.pdf"))
            .await
            .unwrap();
        comments.create("doc", CreateCommentInput::new("Lee", "thanks")).await.unwrap();
        feedback
            .create(CreateFeedbackInput {
                name: "Lee".into(),
                description: "More quizzes please".into(),
                contact: None,
            })
            .await
            .unwrap();

        let dashboard = DashboardService::new(blogs, documents, quizzes, comments, feedback);
        let stats = dashboard.stats().await.unwrap();

        assert_eq!(stats.blogs, BlogCounts { published: 1, drafts: 1 });
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.quizzes, 0);
        assert_eq!(stats.questions, 0);
        assert_eq!(stats.comments, 1);
        assert_eq!(stats.feedback.pending, 1);
        assert_eq!(stats.recent_feedback.len(), 1);
        assert_eq!(stats.recent_comments[0].document_slug, "doc");
    }
}

//! Comment service

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::{CommentRepository, DocumentRepository};
use crate::models::limits::{self, COMMENT_CONTENT_MAX, COMMENT_NAME_MAX};
use crate::models::{Comment, CommentWithDocument, CreateCommentInput, Document, ListParams, PagedResult};

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comments on documents
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    document_repo: Arc<dyn DocumentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, document_repo: Arc<dyn DocumentRepository>) -> Self {
        Self { repo, document_repo }
    }

    async fn document(&self, slug: &str) -> Result<Document, CommentServiceError> {
        self.document_repo
            .get_by_slug(slug)
            .await
            .context("Failed to look up document")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("document '{}'", slug)))
    }

    /// Comments on a document, newest first
    pub async fn list_for_document(
        &self,
        document_slug: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Comment>, CommentServiceError> {
        let document = self.document(document_slug).await?;
        let items = self
            .repo
            .list_by_document(document.id, params.offset(), params.limit())
            .await
            .context("Failed to list comments")?;
        let total = self
            .repo
            .count_by_document(document.id)
            .await
            .context("Failed to count comments")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Post a comment on a document. Name and content are trimmed.
    pub async fn create(
        &self,
        document_slug: &str,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let name = limits::required("Name", &input.name, COMMENT_NAME_MAX)
            .map_err(CommentServiceError::ValidationError)?;
        let content = limits::required("Comment", &input.content, COMMENT_CONTENT_MAX)
            .map_err(CommentServiceError::ValidationError)?;
        let document = self.document(document_slug).await?;

        let comment = self
            .repo
            .create(&Comment {
                id: 0,
                document_id: document.id,
                name,
                content,
                created_at: Utc::now(),
            })
            .await
            .context("Failed to create comment")?;

        tracing::info!("Created comment {} on document {}", comment.id, document.slug);
        Ok(comment)
    }

    /// Recent comments across all documents (admin)
    pub async fn list_recent(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<CommentWithDocument>, CommentServiceError> {
        let items = self
            .repo
            .list_recent(params.offset(), params.limit())
            .await
            .context("Failed to list recent comments")?;
        let total = self.repo.count().await.context("Failed to count comments")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete comment")?;
        if !deleted {
            return Err(CommentServiceError::NotFound(format!("comment {}", id)));
        }
        tracing::info!("Deleted comment {}", id);
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, CommentServiceError> {
        Ok(self.repo.count().await.context("Failed to count comments")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxDocumentRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_service() -> CommentService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        pool.execute("INSERT INTO documents (title, slug, file_url) VALUES ('Notes', 'notes', '/f/notes.pdf')")
            .await
            .unwrap();
        CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxDocumentRepository::boxed(pool),
        )
    }

    #[tokio::test]
    async fn test_create_trims_and_lists() {
        let service = setup_service().await;
        let comment = service
            .create("notes", CreateCommentInput::new("  Sam ", " Very helpful! "))
            .await
            .unwrap();
        assert_eq!(comment.name, "Sam");
        assert_eq!(comment.content, "Very helpful!");

        let page = service.list_for_document("notes", &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, comment.id);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = setup_service().await;
        let blank = service.create("notes", CreateCommentInput::new("Sam", "   ")).await;
        assert!(matches!(blank, Err(CommentServiceError::ValidationError(_))));

        let long_name = service
            .create("notes", CreateCommentInput::new("n".repeat(COMMENT_NAME_MAX + 1), "hi"))
            .await;
        assert!(matches!(long_name, Err(CommentServiceError::ValidationError(_))));

        let long_body = service
            .create("notes", CreateCommentInput::new("Sam", "c".repeat(COMMENT_CONTENT_MAX + 1)))
            .await;
        assert!(matches!(long_body, Err(CommentServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let service = setup_service().await;
        let result = service.create("nope", CreateCommentInput::new("Sam", "hi")).await;
        assert!(matches!(result, Err(CommentServiceError::NotFound(_))));
        let result = service.list_for_document("nope", &ListParams::default()).await;
        assert!(matches!(result, Err(CommentServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_recent_and_delete() {
        let service = setup_service().await;
        let c = service.create("notes", CreateCommentInput::new("A", "one")).await.unwrap();
        service.create("notes", CreateCommentInput::new("B", "two")).await.unwrap();

        let recent = service.list_recent(&ListParams::default()).await.unwrap();
        assert_eq!(recent.total, 2);
        assert_eq!(recent.items[0].document_slug, "notes");

        service.delete(c.id).await.unwrap();
        assert_eq!(service.count().await.unwrap(), 1);
        assert!(matches!(service.delete(c.id).await, Err(CommentServiceError::NotFound(_))));
    }
}

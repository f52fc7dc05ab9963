//! Feedback service

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::FeedbackRepository;
use crate::models::limits::{self, FEEDBACK_CONTACT_MAX, FEEDBACK_DESCRIPTION_MAX, FEEDBACK_NAME_MAX};
use crate::models::{CreateFeedbackInput, Feedback, FeedbackCounts, FeedbackStatus, ListParams, PagedResult};

#[derive(Debug, thiserror::Error)]
pub enum FeedbackServiceError {
    #[error("Feedback not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Visitor feedback and its review workflow
pub struct FeedbackService {
    repo: Arc<dyn FeedbackRepository>,
}

impl FeedbackService {
    pub fn new(repo: Arc<dyn FeedbackRepository>) -> Self {
        Self { repo }
    }

    /// Record feedback as `pending`
    pub async fn create(&self, input: CreateFeedbackInput) -> Result<Feedback, FeedbackServiceError> {
        let name = limits::required("Name", &input.name, FEEDBACK_NAME_MAX)
            .map_err(FeedbackServiceError::ValidationError)?;
        let description = limits::required("Description", &input.description, FEEDBACK_DESCRIPTION_MAX)
            .map_err(FeedbackServiceError::ValidationError)?;
        let contact = limits::optional("Contact", input.contact.as_deref().unwrap_or(""), FEEDBACK_CONTACT_MAX)
            .map_err(FeedbackServiceError::ValidationError)?;

        let now = Utc::now();
        let feedback = self
            .repo
            .create(&Feedback {
                id: 0,
                name,
                description,
                contact,
                status: FeedbackStatus::Pending,
                created_at: now,
                updated_at: now,
            })
            .await
            .context("Failed to create feedback")?;

        tracing::info!("Received feedback {}", feedback.id);
        Ok(feedback)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Feedback, FeedbackServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get feedback")?
            .ok_or(FeedbackServiceError::NotFound(id))
    }

    /// Newest first, optionally restricted to one status
    pub async fn list(
        &self,
        status: Option<FeedbackStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Feedback>, FeedbackServiceError> {
        let items = self
            .repo
            .list(status, params.offset(), params.limit())
            .await
            .context("Failed to list feedback")?;
        let total = self.repo.count(status).await.context("Failed to count feedback")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Move an entry to any status
    pub async fn update_status(&self, id: i64, status: FeedbackStatus) -> Result<Feedback, FeedbackServiceError> {
        let updated = self
            .repo
            .update_status(id, status, Utc::now())
            .await
            .context("Failed to update feedback status")?;
        if !updated {
            return Err(FeedbackServiceError::NotFound(id));
        }
        tracing::info!("Feedback {} marked {}", id, status);
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), FeedbackServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete feedback")?;
        if !deleted {
            return Err(FeedbackServiceError::NotFound(id));
        }
        tracing::info!("Deleted feedback {}", id);
        Ok(())
    }

    pub async fn counts(&self) -> Result<FeedbackCounts, FeedbackServiceError> {
        Ok(self
            .repo
            .count_by_status()
            .await
            .context("Failed to count feedback")?)
    }
}

//! Document service
//!
//! Documents are records of uploaded study files. Besides CRUD this service
//! provides the distinct values that drive the search filters and the
//! "related documents" list shown next to a document.

use anyhow::Context;
use chrono::{Datelike, Utc};
use std::sync::Arc;

use crate::cache::Cache;
use crate::db::query::is_unique_violation;
use crate::db::repositories::{CommentRepository, DocumentRepository};
use crate::models::limits::{
    self, DESCRIPTION_MAX, SUBJECT_MAX, TAGS_PER_DOCUMENT, TAG_MAX, TITLE_MAX, UNIVERSITY_MAX,
    YEAR_MAX, YEAR_MIN,
};
use crate::models::{
    CreateDocumentInput, Document, DocumentFilter, DocumentFilterOptions, DocumentType, ListParams,
    PagedResult, UpdateDocumentInput,
};
use crate::services::slug::{generate_slug, insert_with_unique_slug, is_valid_slug, SlugInsert};
use crate::services::{cached, invalidate, store};

const CACHE_KEY_DOCUMENT_BY_SLUG: &str = "document:slug:";
const CACHE_KEY_DOCUMENT_LIST: &str = "documents:list";
const CACHE_KEY_DOCUMENT_FILTERS: &str = "documents:filters";

const DOCUMENT_CACHE_PATTERNS: [&str; 2] = ["document:*", "documents:*"];

/// Upper bound for the related-documents list
pub const MAX_RELATED: i64 = 12;

#[derive(Debug, thiserror::Error)]
pub enum DocumentServiceError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Document slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Document management
pub struct DocumentService {
    repo: Arc<dyn DocumentRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    cache: Arc<Cache>,
}

impl DocumentService {
    pub fn new(
        repo: Arc<dyn DocumentRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            comment_repo,
            cache,
        }
    }

    pub async fn create(&self, input: CreateDocumentInput) -> Result<Document, DocumentServiceError> {
        let now = Utc::now();
        let draft = Document {
            id: 0,
            slug: String::new(),
            title: validation(limits::required("Title", &input.title, TITLE_MAX))?,
            doc_type: input.doc_type,
            subject: validation(limits::optional("Subject", &input.subject, SUBJECT_MAX))?,
            university: validation(limits::optional("University", &input.university, UNIVERSITY_MAX))?,
            year: validate_year(input.year)?,
            file_url: validation(limits::url("File URL", &input.file_url))?,
            description: validation(limits::optional("Description", &input.description, DESCRIPTION_MAX))?,
            tags: normalize_tags(&input.tags)?,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };

        let document = match explicit_slug(input.slug.as_deref())? {
            Some(slug) => {
                if self.repo.exists_by_slug(&slug, None).await? {
                    return Err(DocumentServiceError::DuplicateSlug(slug));
                }
                match self.repo.create(&Document { slug: slug.clone(), ..draft }).await {
                    Ok(document) => document,
                    Err(e) if is_unique_violation(&e) => {
                        return Err(DocumentServiceError::DuplicateSlug(slug))
                    }
                    Err(e) => return Err(e.context("Failed to create document").into()),
                }
            }
            None => {
                let base = generate_slug(&draft.title);
                let outcome = insert_with_unique_slug(
                    &base,
                    |slug| async move { self.repo.exists_by_slug(&slug, None).await },
                    |slug| {
                        let document = Document { slug, ..draft.clone() };
                        async move { self.repo.create(&document).await }
                    },
                )
                .await
                .context("Failed to create document")?;
                match outcome {
                    SlugInsert::Inserted(document) => document,
                    SlugInsert::Exhausted => return Err(DocumentServiceError::DuplicateSlug(base)),
                }
            }
        };

        tracing::info!("Created document {} ({})", document.id, document.slug);
        invalidate(&self.cache, &DOCUMENT_CACHE_PATTERNS).await;
        Ok(document)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Document, DocumentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get document by ID")?
            .ok_or_else(|| DocumentServiceError::NotFound(id.to_string()))
    }

    /// Read a document by slug without side effects
    pub async fn get_by_slug(&self, slug: &str) -> Result<Document, DocumentServiceError> {
        let key = format!("{}{}", CACHE_KEY_DOCUMENT_BY_SLUG, slug);
        if let Some(document) = cached::<Document>(&self.cache, &key).await {
            return Ok(document);
        }

        let document = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get document by slug")?
            .ok_or_else(|| DocumentServiceError::NotFound(slug.to_string()))?;
        store(&self.cache, &key, &document).await;
        Ok(document)
    }

    /// Read a document for display, counting the view.
    ///
    /// The returned view count includes this view; cached copies may lag.
    pub async fn view(&self, slug: &str) -> Result<Document, DocumentServiceError> {
        let mut document = self.get_by_slug(slug).await?;
        self.repo
            .increment_view(document.id)
            .await
            .context("Failed to record document view")?;
        document.view_count += 1;
        Ok(document)
    }

    pub async fn list(
        &self,
        filter: &DocumentFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Document>, DocumentServiceError> {
        let key = format!(
            "{}:{}:{}:{}",
            CACHE_KEY_DOCUMENT_LIST,
            params.page,
            params.per_page,
            filter_cache_key(filter)
        );
        if let Some(page) = cached::<PagedResult<Document>>(&self.cache, &key).await {
            return Ok(page);
        }

        let items = self
            .repo
            .list(filter, params.offset(), params.limit())
            .await
            .context("Failed to list documents")?;
        let total = self.repo.count(filter).await.context("Failed to count documents")?;
        let page = PagedResult::new(items, total, params);
        store(&self.cache, &key, &page).await;
        Ok(page)
    }

    /// Distinct subjects and universities, plus every document type
    pub async fn filter_options(&self) -> Result<DocumentFilterOptions, DocumentServiceError> {
        if let Some(options) = cached::<DocumentFilterOptions>(&self.cache, CACHE_KEY_DOCUMENT_FILTERS).await {
            return Ok(options);
        }

        let options = DocumentFilterOptions {
            subjects: self.repo.list_subjects().await.context("Failed to list subjects")?,
            universities: self
                .repo
                .list_universities()
                .await
                .context("Failed to list universities")?,
            types: DocumentType::ALL.to_vec(),
        };
        store(&self.cache, CACHE_KEY_DOCUMENT_FILTERS, &options).await;
        Ok(options)
    }

    /// Documents on the same subject, newest first, excluding `slug` itself
    pub async fn related(&self, slug: &str, limit: i64) -> Result<Vec<Document>, DocumentServiceError> {
        let document = self.get_by_slug(slug).await?;
        if document.subject.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .repo
            .list_related(&document.subject, document.id, limit.clamp(1, MAX_RELATED))
            .await
            .context("Failed to list related documents")?)
    }

    pub async fn update(&self, id: i64, input: UpdateDocumentInput) -> Result<Document, DocumentServiceError> {
        let existing = self.get_by_id(id).await?;
        let mut document = existing.clone();

        if let Some(title) = input.title.as_deref() {
            document.title = validation(limits::required("Title", title, TITLE_MAX))?;
        }
        if let Some(doc_type) = input.doc_type {
            document.doc_type = doc_type;
        }
        if let Some(subject) = input.subject.as_deref() {
            document.subject = validation(limits::optional("Subject", subject, SUBJECT_MAX))?;
        }
        if let Some(university) = input.university.as_deref() {
            document.university = validation(limits::optional("University", university, UNIVERSITY_MAX))?;
        }
        if input.year.is_some() {
            document.year = validate_year(input.year)?;
        }
        if let Some(file_url) = input.file_url.as_deref() {
            document.file_url = validation(limits::url("File URL", file_url))?;
        }
        if let Some(description) = input.description.as_deref() {
            document.description = validation(limits::optional("Description", description, DESCRIPTION_MAX))?;
        }
        if let Some(tags) = input.tags.as_deref() {
            document.tags = normalize_tags(tags)?;
        }
        if let Some(slug) = explicit_slug(input.slug.as_deref())? {
            if slug != existing.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(DocumentServiceError::DuplicateSlug(slug));
            }
            document.slug = slug;
        }
        document.updated_at = Utc::now();

        let updated = match self.repo.update(&document).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => {
                return Err(DocumentServiceError::DuplicateSlug(document.slug))
            }
            Err(e) => return Err(e.context("Failed to update document").into()),
        };

        tracing::info!("Updated document {} ({})", updated.id, updated.slug);
        invalidate(&self.cache, &DOCUMENT_CACHE_PATTERNS).await;
        Ok(updated)
    }

    /// Delete a document and its comments.
    ///
    /// Comments go first; if the document delete then fails they stay gone.
    pub async fn delete(&self, id: i64) -> Result<(), DocumentServiceError> {
        let document = self.get_by_id(id).await?;

        let removed = self
            .comment_repo
            .delete_by_document(id)
            .await
            .context("Failed to delete document comments")?;
        let deleted = self.repo.delete(id).await.context("Failed to delete document")?;
        if !deleted {
            return Err(DocumentServiceError::NotFound(id.to_string()));
        }

        tracing::info!(
            "Deleted document {} ({}) and {} comments",
            id,
            document.slug,
            removed
        );
        invalidate(&self.cache, &DOCUMENT_CACHE_PATTERNS).await;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, DocumentServiceError> {
        Ok(self
            .repo
            .count(&DocumentFilter::default())
            .await
            .context("Failed to count documents")?)
    }
}

fn validation<T>(result: Result<T, String>) -> Result<T, DocumentServiceError> {
    result.map_err(DocumentServiceError::ValidationError)
}

fn validate_year(year: Option<i32>) -> Result<Option<i32>, DocumentServiceError> {
    match year {
        Some(y) if !(YEAR_MIN..=YEAR_MAX).contains(&y) => Err(DocumentServiceError::ValidationError(
            format!("Year must be between {} and {}", YEAR_MIN, YEAR_MAX),
        )),
        Some(y) if y > Utc::now().year() + 1 => Err(DocumentServiceError::ValidationError(
            format!("Year {} is in the future", y),
        )),
        other => Ok(other),
    }
}

/// Trim, lowercase and de-duplicate tags, dropping empty ones
fn normalize_tags(tags: &[String]) -> Result<Vec<String>, DocumentServiceError> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || out.contains(&tag) {
            continue;
        }
        if limits::char_len(&tag) > TAG_MAX {
            return Err(DocumentServiceError::ValidationError(format!(
                "Tag '{}' exceeds {} characters",
                tag, TAG_MAX
            )));
        }
        out.push(tag);
    }
    if out.len() > TAGS_PER_DOCUMENT {
        return Err(DocumentServiceError::ValidationError(format!(
            "A document can have at most {} tags",
            TAGS_PER_DOCUMENT
        )));
    }
    Ok(out)
}

fn explicit_slug(slug: Option<&str>) -> Result<Option<String>, DocumentServiceError> {
    match slug.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if is_valid_slug(s) => Ok(Some(s.to_string())),
        Some(s) => Err(DocumentServiceError::ValidationError(format!(
            "Invalid slug '{}': use lowercase letters, digits and single hyphens",
            s
        ))),
    }
}

fn filter_cache_key(filter: &DocumentFilter) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        filter.sort.as_str(),
        filter.doc_type.map(|t| t.as_str()).unwrap_or(""),
        filter.subject.as_deref().unwrap_or(""),
        filter.university.as_deref().unwrap_or(""),
        filter.year.map(|y| y.to_string()).unwrap_or_default(),
        filter.tag.as_deref().unwrap_or("").to_lowercase(),
        filter.search.as_deref().unwrap_or("").to_lowercase(),
    )
}

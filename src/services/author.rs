//! Author service

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

use crate::cache::Cache;
use crate::db::query::is_unique_violation;
use crate::db::repositories::AuthorRepository;
use crate::models::limits::{self, AUTHOR_BIO_MAX, AUTHOR_NAME_MAX};
use crate::models::{Author, CreateAuthorInput, ListParams, PagedResult, UpdateAuthorInput};
use crate::services::slug::{generate_slug, insert_with_unique_slug, is_valid_slug, SlugInsert};
use crate::services::{cached, invalidate, store};

const CACHE_KEY_AUTHOR_BY_SLUG: &str = "author:slug:";
const CACHE_KEY_AUTHOR_LIST: &str = "authors:list";

#[derive(Debug, thiserror::Error)]
pub enum AuthorServiceError {
    #[error("Author not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Author slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Author management
pub struct AuthorService {
    repo: Arc<dyn AuthorRepository>,
    cache: Arc<Cache>,
}

impl AuthorService {
    pub fn new(repo: Arc<dyn AuthorRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Create an author. The slug is derived from the name unless given.
    pub async fn create(&self, input: CreateAuthorInput) -> Result<Author, AuthorServiceError> {
        let name = limits::required("Name", &input.name, AUTHOR_NAME_MAX)
            .map_err(AuthorServiceError::ValidationError)?;
        let bio = limits::optional("Bio", &input.bio, AUTHOR_BIO_MAX)
            .map_err(AuthorServiceError::ValidationError)?;
        let avatar_url = limits::optional_url("Avatar URL", input.avatar_url.as_deref())
            .map_err(AuthorServiceError::ValidationError)?;

        let now = Utc::now();
        let draft = Author {
            id: 0,
            slug: String::new(),
            name,
            bio,
            avatar_url,
            created_at: now,
            updated_at: now,
        };

        let author = match explicit_slug(input.slug.as_deref())? {
            Some(slug) => {
                if self.repo.exists_by_slug(&slug, None).await? {
                    return Err(AuthorServiceError::DuplicateSlug(slug));
                }
                match self.repo.create(&Author { slug: slug.clone(), ..draft }).await {
                    Ok(author) => author,
                    Err(e) if is_unique_violation(&e) => {
                        return Err(AuthorServiceError::DuplicateSlug(slug))
                    }
                    Err(e) => return Err(e.context("Failed to create author").into()),
                }
            }
            None => {
                let base = generate_slug(&draft.name);
                let outcome = insert_with_unique_slug(
                    &base,
                    |slug| async move { self.repo.exists_by_slug(&slug, None).await },
                    |slug| {
                        let author = Author { slug, ..draft.clone() };
                        async move { self.repo.create(&author).await }
                    },
                )
                .await
                .context("Failed to create author")?;
                match outcome {
                    SlugInsert::Inserted(author) => author,
                    SlugInsert::Exhausted => return Err(AuthorServiceError::DuplicateSlug(base)),
                }
            }
        };

        tracing::info!("Created author {} ({})", author.id, author.slug);
        invalidate(&self.cache, &["authors:*"]).await;
        Ok(author)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Author, AuthorServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| AuthorServiceError::NotFound(id.to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Author, AuthorServiceError> {
        let key = format!("{}{}", CACHE_KEY_AUTHOR_BY_SLUG, slug);
        if let Some(author) = cached::<Author>(&self.cache, &key).await {
            return Ok(author);
        }

        let author = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| AuthorServiceError::NotFound(slug.to_string()))?;
        store(&self.cache, &key, &author).await;
        Ok(author)
    }

    /// Authors in name order
    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Author>, AuthorServiceError> {
        let key = format!("{}:{}:{}", CACHE_KEY_AUTHOR_LIST, params.page, params.per_page);
        if let Some(page) = cached::<PagedResult<Author>>(&self.cache, &key).await {
            return Ok(page);
        }

        let items = self
            .repo
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list authors")?;
        let total = self.repo.count().await.context("Failed to count authors")?;
        let page = PagedResult::new(items, total, params);
        store(&self.cache, &key, &page).await;
        Ok(page)
    }

    pub async fn update(&self, id: i64, input: UpdateAuthorInput) -> Result<Author, AuthorServiceError> {
        let existing = self.get_by_id(id).await?;
        let mut author = existing.clone();

        if let Some(name) = input.name.as_deref() {
            author.name = limits::required("Name", name, AUTHOR_NAME_MAX)
                .map_err(AuthorServiceError::ValidationError)?;
        }
        if let Some(bio) = input.bio.as_deref() {
            author.bio = limits::optional("Bio", bio, AUTHOR_BIO_MAX)
                .map_err(AuthorServiceError::ValidationError)?;
        }
        if input.avatar_url.is_some() {
            author.avatar_url = limits::optional_url("Avatar URL", input.avatar_url.as_deref())
                .map_err(AuthorServiceError::ValidationError)?;
        }
        if let Some(slug) = explicit_slug(input.slug.as_deref())? {
            if slug != existing.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(AuthorServiceError::DuplicateSlug(slug));
            }
            author.slug = slug;
        }
        author.updated_at = Utc::now();

        let updated = match self.repo.update(&author).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => {
                return Err(AuthorServiceError::DuplicateSlug(author.slug))
            }
            Err(e) => return Err(e.context("Failed to update author").into()),
        };

        tracing::info!("Updated author {} ({})", updated.id, updated.slug);
        invalidate(&self.cache, &["author:*", "authors:*", "blog:*", "blogs:*"]).await;
        Ok(updated)
    }

    /// Delete an author. Their blogs stay, with no author.
    pub async fn delete(&self, id: i64) -> Result<(), AuthorServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete author")?;
        if !deleted {
            return Err(AuthorServiceError::NotFound(id.to_string()));
        }
        tracing::info!("Deleted author {}", id);
        invalidate(&self.cache, &["author:*", "authors:*", "blog:*", "blogs:*"]).await;
        Ok(())
    }
}

/// A caller-supplied slug, if any, checked for shape
fn explicit_slug(slug: Option<&str>) -> Result<Option<String>, AuthorServiceError> {
    match slug.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if is_valid_slug(s) => Ok(Some(s.to_string())),
        Some(s) => Err(AuthorServiceError::ValidationError(format!(
            "Invalid slug '{}': use lowercase letters, digits and single hyphens",
            s
        ))),
    }
}

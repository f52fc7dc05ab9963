//! Blog service
//!
//! Implements business logic for blog posts:
//! - Create, read, update, delete
//! - Markdown rendering and excerpt derivation
//! - Unique slug allocation
//! - Cache invalidation

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

use crate::cache::Cache;
use crate::db::query::is_unique_violation;
use crate::db::repositories::{AuthorRepository, BlogRepository};
use crate::models::limits::{self, BLOG_CONTENT_MAX, EXCERPT_MAX, TITLE_MAX};
use crate::models::{Blog, BlogFilter, CreateBlogInput, ListParams, PagedResult, UpdateBlogInput};
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::{generate_slug, insert_with_unique_slug, is_valid_slug, SlugInsert};
use crate::services::{cached, invalidate, store};

/// Length of excerpts derived from content
const AUTO_EXCERPT_CHARS: usize = 200;

/// Cache key prefixes
const CACHE_KEY_BLOG_BY_SLUG: &str = "blog:slug:";
const CACHE_KEY_BLOG_LIST: &str = "blogs:list";

const BLOG_CACHE_PATTERNS: [&str; 2] = ["blog:*", "blogs:*"];

/// Error types for blog service operations
#[derive(Debug, thiserror::Error)]
pub enum BlogServiceError {
    #[error("Blog not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Blog slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Blog post management
pub struct BlogService {
    repo: Arc<dyn BlogRepository>,
    author_repo: Arc<dyn AuthorRepository>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
}

impl BlogService {
    pub fn new(
        repo: Arc<dyn BlogRepository>,
        author_repo: Arc<dyn AuthorRepository>,
        cache: Arc<Cache>,
        markdown: MarkdownRenderer,
    ) -> Self {
        Self {
            repo,
            author_repo,
            cache,
            markdown,
        }
    }

    /// Create a blog post
    ///
    /// # Errors
    /// - `ValidationError` for an empty or oversized title/content, a bad
    ///   slug, or an unknown author
    /// - `DuplicateSlug` if an explicit slug is taken
    pub async fn create(&self, input: CreateBlogInput) -> Result<Blog, BlogServiceError> {
        let title = limits::required("Title", &input.title, TITLE_MAX)
            .map_err(BlogServiceError::ValidationError)?;
        let content = limits::required("Content", &input.content, BLOG_CONTENT_MAX)
            .map_err(BlogServiceError::ValidationError)?;
        let excerpt = limits::optional("Excerpt", input.excerpt.as_deref().unwrap_or(""), EXCERPT_MAX)
            .map_err(BlogServiceError::ValidationError)?;
        if let Some(author_id) = input.author_id {
            self.ensure_author(author_id).await?;
        }

        let now = Utc::now();
        let draft = Blog {
            id: 0,
            slug: String::new(),
            excerpt: self.excerpt_or_derived(excerpt, &content),
            content_html: self.markdown.render(&content),
            title,
            content,
            author_id: input.author_id,
            published: input.published,
            published_at: input.published.then_some(now),
            created_at: now,
            updated_at: now,
        };

        let blog = match explicit_slug(input.slug.as_deref())? {
            Some(slug) => {
                if self.repo.exists_by_slug(&slug, None).await? {
                    return Err(BlogServiceError::DuplicateSlug(slug));
                }
                match self.repo.create(&Blog { slug: slug.clone(), ..draft }).await {
                    Ok(blog) => blog,
                    Err(e) if is_unique_violation(&e) => return Err(BlogServiceError::DuplicateSlug(slug)),
                    Err(e) => return Err(e.context("Failed to create blog").into()),
                }
            }
            None => {
                let base = generate_slug(&draft.title);
                let outcome = insert_with_unique_slug(
                    &base,
                    |slug| async move { self.repo.exists_by_slug(&slug, None).await },
                    |slug| {
                        let blog = Blog { slug, ..draft.clone() };
                        async move { self.repo.create(&blog).await }
                    },
                )
                .await
                .context("Failed to create blog")?;
                match outcome {
                    SlugInsert::Inserted(blog) => blog,
                    SlugInsert::Exhausted => return Err(BlogServiceError::DuplicateSlug(base)),
                }
            }
        };

        tracing::info!("Created blog {} ({})", blog.id, blog.slug);
        invalidate(&self.cache, &BLOG_CACHE_PATTERNS).await;
        Ok(blog)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Blog, BlogServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get blog by ID")?
            .ok_or_else(|| BlogServiceError::NotFound(id.to_string()))
    }

    /// Public read: drafts are reported as not found
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Blog, BlogServiceError> {
        let key = format!("{}{}", CACHE_KEY_BLOG_BY_SLUG, slug);
        if let Some(blog) = cached::<Blog>(&self.cache, &key).await {
            return Ok(blog);
        }

        let blog = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get blog by slug")?
            .filter(|b| b.published)
            .ok_or_else(|| BlogServiceError::NotFound(slug.to_string()))?;
        store(&self.cache, &key, &blog).await;
        Ok(blog)
    }

    /// List posts matching a filter (drafts included unless `published_only`)
    pub async fn list(
        &self,
        filter: &BlogFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Blog>, BlogServiceError> {
        let items = self
            .repo
            .list(filter, params.offset(), params.limit())
            .await
            .context("Failed to list blogs")?;
        let total = self.repo.count(filter).await.context("Failed to count blogs")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Public listing: published posts only, cached per filter and page
    pub async fn list_published(
        &self,
        filter: &BlogFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Blog>, BlogServiceError> {
        let filter = BlogFilter {
            published_only: true,
            ..filter.clone()
        };
        let key = format!(
            "{}:{}:{}:{}:{}:{}",
            CACHE_KEY_BLOG_LIST,
            params.page,
            params.per_page,
            filter.sort.as_str(),
            filter.author_id.map(|id| id.to_string()).unwrap_or_default(),
            filter.search.as_deref().unwrap_or("").to_lowercase(),
        );
        if let Some(page) = cached::<PagedResult<Blog>>(&self.cache, &key).await {
            return Ok(page);
        }

        let page = self.list(&filter, params).await?;
        store(&self.cache, &key, &page).await;
        Ok(page)
    }

    /// Update a blog post
    ///
    /// Changing the title keeps the slug; pass `slug` to change the URL.
    /// `published_at` is set the first time a post is published.
    pub async fn update(&self, id: i64, input: UpdateBlogInput) -> Result<Blog, BlogServiceError> {
        let existing = self.get_by_id(id).await?;
        if !input.has_changes() {
            return Ok(existing);
        }
        let mut blog = existing.clone();

        if let Some(title) = input.title.as_deref() {
            blog.title = limits::required("Title", title, TITLE_MAX)
                .map_err(BlogServiceError::ValidationError)?;
        }
        if let Some(content) = input.content.as_deref() {
            blog.content = limits::required("Content", content, BLOG_CONTENT_MAX)
                .map_err(BlogServiceError::ValidationError)?;
            blog.content_html = self.markdown.render(&blog.content);
        }
        if let Some(excerpt) = input.excerpt.as_deref() {
            let excerpt = limits::optional("Excerpt", excerpt, EXCERPT_MAX)
                .map_err(BlogServiceError::ValidationError)?;
            blog.excerpt = self.excerpt_or_derived(excerpt, &blog.content);
        } else if input.content.is_some() && existing.excerpt == self.markdown.excerpt(&existing.content, AUTO_EXCERPT_CHARS) {
            // Excerpt was derived, keep it in step with the content
            blog.excerpt = self.markdown.excerpt(&blog.content, AUTO_EXCERPT_CHARS);
        }
        if let Some(author_id) = input.author_id {
            self.ensure_author(author_id).await?;
            blog.author_id = Some(author_id);
        }
        if let Some(published) = input.published {
            blog.published = published;
            if published && blog.published_at.is_none() {
                blog.published_at = Some(Utc::now());
            }
        }
        if let Some(slug) = explicit_slug(input.slug.as_deref())? {
            if slug != existing.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(BlogServiceError::DuplicateSlug(slug));
            }
            blog.slug = slug;
        }
        blog.updated_at = Utc::now();

        let updated = match self.repo.update(&blog).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(BlogServiceError::DuplicateSlug(blog.slug)),
            Err(e) => return Err(e.context("Failed to update blog").into()),
        };

        tracing::info!("Updated blog {} ({})", updated.id, updated.slug);
        invalidate(&self.cache, &BLOG_CACHE_PATTERNS).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), BlogServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete blog")?;
        if !deleted {
            return Err(BlogServiceError::NotFound(id.to_string()));
        }
        tracing::info!("Deleted blog {}", id);
        invalidate(&self.cache, &BLOG_CACHE_PATTERNS).await;
        Ok(())
    }

    pub async fn count_published(&self) -> Result<i64, BlogServiceError> {
        Ok(self
            .repo
            .count(&BlogFilter::published())
            .await
            .context("Failed to count published blogs")?)
    }

    pub async fn count_drafts(&self) -> Result<i64, BlogServiceError> {
        let all = self
            .repo
            .count(&BlogFilter::default())
            .await
            .context("Failed to count blogs")?;
        Ok(all - self.count_published().await?)
    }

    async fn ensure_author(&self, author_id: i64) -> Result<(), BlogServiceError> {
        let author = self
            .author_repo
            .get_by_id(author_id)
            .await
            .context("Failed to look up author")?;
        match author {
            Some(_) => Ok(()),
            None => Err(BlogServiceError::ValidationError(format!(
                "Author {} does not exist",
                author_id
            ))),
        }
    }

    fn excerpt_or_derived(&self, excerpt: String, content: &str) -> String {
        if excerpt.is_empty() {
            self.markdown.excerpt(content, AUTO_EXCERPT_CHARS)
        } else {
            excerpt
        }
    }
}

fn explicit_slug(slug: Option<&str>) -> Result<Option<String>, BlogServiceError> {
    match slug.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if is_valid_slug(s) => Ok(Some(s.to_string())),
        Some(s) => Err(BlogServiceError::ValidationError(format!(
            "Invalid slug '{}': use lowercase letters, digits and single hyphens",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxAuthorRepository, SqlxBlogRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::SortOrder;
    use futures::future::join_all;

    async fn setup_service() -> BlogService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        pool.execute("INSERT INTO authors (name, slug, bio) VALUES ('Ada', 'ada', '')")
            .await
            .unwrap();
        BlogService::new(
            SqlxBlogRepository::boxed(pool.clone()),
            SqlxAuthorRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
            MarkdownRenderer::new(),
        )
    }

    #[tokio::test]
    async fn test_create_renders_and_derives() {
        let service = setup_service().await;
        let blog = service
            .create(CreateBlogInput::new("Exam Week Survival", "# Plan\n\nSleep **well**.").published())
            .await
            .unwrap();

        assert_eq!(blog.slug, "exam-week-survival");
        assert!(blog.content_html.contains("<strong>well</strong>"));
        assert_eq!(blog.excerpt, "Plan Sleep well.");
        assert!(blog.published_at.is_some());
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = setup_service().await;
        let empty_title = service.create(CreateBlogInput::new("  ", "body")).await;
        assert!(matches!(empty_title, Err(BlogServiceError::ValidationError(_))));

        let long_title = service.create(CreateBlogInput::new("x".repeat(TITLE_MAX + 1), "body")).await;
        assert!(matches!(long_title, Err(BlogServiceError::ValidationError(_))));

        let unknown_author = service.create(CreateBlogInput::new("t", "body").with_author(99)).await;
        assert!(matches!(unknown_author, Err(BlogServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_slugs() {
        let service = Arc::new(setup_service().await);
        let tasks = (0..8).map(|_| {
            let service = service.clone();
            async move { service.create(CreateBlogInput::new("Same Title", "body")).await }
        });
        let results = join_all(tasks).await;

        let mut slugs: Vec<String> = results.into_iter().map(|r| r.unwrap().slug).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), 8);
        assert!(slugs.contains(&"same-title".to_string()));
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public_reads() {
        let service = setup_service().await;
        service.create(CreateBlogInput::new("Draft", "wip")).await.unwrap();
        service.create(CreateBlogInput::new("Live", "done").published()).await.unwrap();

        assert!(matches!(
            service.get_published_by_slug("draft").await,
            Err(BlogServiceError::NotFound(_))
        ));
        let page = service.list_published(&BlogFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(service.count_published().await.unwrap(), 1);
        assert_eq!(service.count_drafts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_publish_invalidates_public_list() {
        let service = setup_service().await;
        let draft = service.create(CreateBlogInput::new("Soon", "body")).await.unwrap();
        let before = service.list_published(&BlogFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(before.total, 0);

        let update = UpdateBlogInput {
            published: Some(true),
            ..Default::default()
        };
        let published = service.update(draft.id, update).await.unwrap();
        assert!(published.published_at.is_some());

        let after = service.list_published(&BlogFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(after.total, 1);
    }

    #[tokio::test]
    async fn test_update_keeps_slug_and_rederives_excerpt() {
        let service = setup_service().await;
        let blog = service.create(CreateBlogInput::new("Original", "first body")).await.unwrap();

        let update = UpdateBlogInput {
            title: Some("Renamed".into()),
            content: Some("second body".into()),
            ..Default::default()
        };
        let updated = service.update(blog.id, update).await.unwrap();
        assert_eq!(updated.slug, "original");
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.excerpt, "second body");
        assert!(updated.content_html.contains("second body"));
    }

    #[tokio::test]
    async fn test_update_slug_conflict() {
        let service = setup_service().await;
        service.create(CreateBlogInput::new("One", "a")).await.unwrap();
        let two = service.create(CreateBlogInput::new("Two", "b")).await.unwrap();

        let update = UpdateBlogInput {
            slug: Some("one".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(two.id, update).await,
            Err(BlogServiceError::DuplicateSlug(_))
        ));
    }

    #[tokio::test]
    async fn test_list_search_and_sort() {
        let service = setup_service().await;
        for title in ["Beta notes", "Alpha notes", "Gamma"] {
            service.create(CreateBlogInput::new(title, "text").published()).await.unwrap();
        }
        let filter = BlogFilter {
            search: Some("notes".into()),
            sort: SortOrder::Title,
            ..Default::default()
        };
        let page = service.list_published(&filter, &ListParams::default()).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha notes", "Beta notes"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let service = setup_service().await;
        let blog = service.create(CreateBlogInput::new("Temp", "x")).await.unwrap();
        service.delete(blog.id).await.unwrap();
        assert!(matches!(service.get_by_id(blog.id).await, Err(BlogServiceError::NotFound(_))));
        assert!(matches!(service.delete(blog.id).await, Err(BlogServiceError::NotFound(_))));
    }
}

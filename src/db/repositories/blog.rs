//! Blog repository
//!
//! Database operations for blog posts, including the filtered and paginated
//! list queries used by the public listing and the admin panel.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::query::{bind_mysql, bind_sqlite, WhereClause};
use crate::db::DynDatabasePool;
use crate::models::{Blog, BlogFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const BLOG_COLUMNS: &str = "id, title, slug, excerpt, content, content_html, author_id, published, published_at, created_at, updated_at";

/// Blog repository trait
#[async_trait]
pub trait BlogRepository: Send + Sync {
    /// Insert a post; `blog.id` is ignored and the stored row is returned
    async fn create(&self, blog: &Blog) -> Result<Blog>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Blog>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Blog>>;

    /// List posts matching `filter`, ordered by `filter.sort`
    async fn list(&self, filter: &BlogFilter, offset: i64, limit: i64) -> Result<Vec<Blog>>;

    /// Count posts matching `filter`
    async fn count(&self, filter: &BlogFilter) -> Result<i64>;

    /// Persist every field of an existing post
    async fn update(&self, blog: &Blog) -> Result<Blog>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Whether `slug` is taken by a post other than `exclude_id`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based blog repository (SQLite and MySQL)
pub struct SqlxBlogRepository {
    pool: DynDatabasePool,
}

impl SqlxBlogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlogRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Translate a filter into WHERE conditions
fn blog_where(filter: &BlogFilter) -> WhereClause {
    let mut clause = WhereClause::new();
    if filter.published_only {
        clause.raw("published = TRUE");
    }
    if let Some(author_id) = filter.author_id {
        clause.eq_int("author_id", author_id);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        clause.search(&["title", "excerpt", "content"], search);
    }
    clause
}

#[async_trait]
impl BlogRepository for SqlxBlogRepository {
    async fn create(&self, blog: &Blog) -> Result<Blog> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_blog_sqlite(sqlite(&self.pool)?, blog).await,
            DatabaseDriver::Mysql => create_blog_mysql(mysql(&self.pool)?, blog).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Blog>> {
        let sql = format!("SELECT {} FROM blogs WHERE id = ?", BLOG_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get blog by ID")?;
                Ok(row.as_ref().map(row_to_blog_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get blog by ID")?;
                Ok(row.as_ref().map(row_to_blog_mysql))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Blog>> {
        let sql = format!("SELECT {} FROM blogs WHERE slug = ?", BLOG_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get blog by slug")?;
                Ok(row.as_ref().map(row_to_blog_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get blog by slug")?;
                Ok(row.as_ref().map(row_to_blog_mysql))
            }
        }
    }

    async fn list(&self, filter: &BlogFilter, offset: i64, limit: i64) -> Result<Vec<Blog>> {
        let clause = blog_where(filter);
        let sql = format!(
            "SELECT {} FROM blogs{} {} LIMIT ? OFFSET ?",
            BLOG_COLUMNS,
            clause.to_sql(),
            filter.sort.order_by(false)
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), clause.binds())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context("Failed to list blogs")?;
                Ok(rows.iter().map(row_to_blog_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), clause.binds())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list blogs")?;
                Ok(rows.iter().map(row_to_blog_mysql).collect())
            }
        }
    }

    async fn count(&self, filter: &BlogFilter) -> Result<i64> {
        let clause = blog_where(filter);
        let sql = format!("SELECT COUNT(*) AS count FROM blogs{}", clause.to_sql());
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), clause.binds())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count blogs")?
                .get("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), clause.binds())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count blogs")?
                .get("count"),
        };
        Ok(count)
    }

    async fn update(&self, blog: &Blog) -> Result<Blog> {
        let sql = r#"
            UPDATE blogs
            SET title = ?, slug = ?, excerpt = ?, content = ?, content_html = ?, author_id = ?,
                published = ?, published_at = ?, updated_at = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&blog.title)
                    .bind(&blog.slug)
                    .bind(&blog.excerpt)
                    .bind(&blog.content)
                    .bind(&blog.content_html)
                    .bind(blog.author_id)
                    .bind(blog.published)
                    .bind(blog.published_at)
                    .bind(blog.updated_at)
                    .bind(blog.id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to update blog")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&blog.title)
                    .bind(&blog.slug)
                    .bind(&blog.excerpt)
                    .bind(&blog.content)
                    .bind(&blog.content_html)
                    .bind(blog.author_id)
                    .bind(blog.published)
                    .bind(blog.published_at)
                    .bind(blog.updated_at)
                    .bind(blog.id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to update blog")?;
            }
        }

        self.get_by_id(blog.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Blog not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM blogs WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete blog")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete blog")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM blogs WHERE slug = ? AND id <> ?";
        let exclude = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to check blog slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to check blog slug")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_blog_sqlite(pool: &SqlitePool, blog: &Blog) -> Result<Blog> {
    let result = sqlx::query(
        r#"
        INSERT INTO blogs (title, slug, excerpt, content, content_html, author_id, published, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&blog.title)
    .bind(&blog.slug)
    .bind(&blog.excerpt)
    .bind(&blog.content)
    .bind(&blog.content_html)
    .bind(blog.author_id)
    .bind(blog.published)
    .bind(blog.published_at)
    .bind(blog.created_at)
    .bind(blog.updated_at)
    .execute(pool)
    .await
    .context("Failed to create blog")?;

    Ok(Blog {
        id: result.last_insert_rowid(),
        ..blog.clone()
    })
}

fn row_to_blog_sqlite(row: &sqlx::sqlite::SqliteRow) -> Blog {
    Blog {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        author_id: row.get("author_id"),
        published: row.get("published"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_blog_mysql(pool: &MySqlPool, blog: &Blog) -> Result<Blog> {
    let result = sqlx::query(
        r#"
        INSERT INTO blogs (title, slug, excerpt, content, content_html, author_id, published, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&blog.title)
    .bind(&blog.slug)
    .bind(&blog.excerpt)
    .bind(&blog.content)
    .bind(&blog.content_html)
    .bind(blog.author_id)
    .bind(blog.published)
    .bind(blog.published_at)
    .bind(blog.created_at)
    .bind(blog.updated_at)
    .execute(pool)
    .await
    .context("Failed to create blog")?;

    Ok(Blog {
        id: result.last_insert_id() as i64,
        ..blog.clone()
    })
}

fn row_to_blog_mysql(row: &sqlx::mysql::MySqlRow) -> Blog {
    Blog {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        author_id: row.get("author_id"),
        published: row.get("published"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::SortOrder;
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxBlogRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxBlogRepository::new(pool.clone());
        (pool, repo)
    }

    fn new_blog(title: &str, slug: &str, published: bool, age_minutes: i64) -> Blog {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Blog {
            id: 0,
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: String::new(),
            content: format!("Content for {}", title),
            content_html: format!("<p>Content for {}</p>", title),
            author_id: None,
            published,
            published_at: published.then_some(at),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_slug() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo.create(&new_blog("Hello", "hello", true, 0)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_slug("hello").await.unwrap().expect("blog missing");
        assert_eq!(found.id, created.id);
        assert!(found.published);
        assert!(found.published_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&new_blog("A", "same", false, 0)).await.unwrap();

        let err = repo.create(&new_blog("B", "same", false, 0)).await.unwrap_err();
        assert!(crate::db::query::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_list_filters_and_counts_agree() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&new_blog("Rust ownership", "rust-ownership", true, 30)).await.unwrap();
        repo.create(&new_blog("Exam tips", "exam-tips", true, 20)).await.unwrap();
        repo.create(&new_blog("Rust draft", "rust-draft", false, 10)).await.unwrap();

        let published = BlogFilter::published();
        assert_eq!(repo.count(&published).await.unwrap(), 2);
        let items = repo.list(&published, 0, 10).await.unwrap();
        assert_eq!(items.len(), 2);
        // Newest first
        assert_eq!(items[0].slug, "exam-tips");

        let search = BlogFilter {
            search: Some("RUST".into()),
            ..Default::default()
        };
        assert_eq!(repo.count(&search).await.unwrap(), 2);

        let search_published = BlogFilter {
            search: Some("rust".into()),
            published_only: true,
            ..Default::default()
        };
        let items = repo.list(&search_published, 0, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug, "rust-ownership");
    }

    #[tokio::test]
    async fn test_list_sort_orders() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&new_blog("Beta", "beta", true, 10)).await.unwrap();
        repo.create(&new_blog("Alpha", "alpha", true, 5)).await.unwrap();
        repo.create(&new_blog("Gamma", "gamma", true, 20)).await.unwrap();

        let slugs = |items: Vec<Blog>| items.into_iter().map(|b| b.slug).collect::<Vec<_>>();

        let oldest = BlogFilter {
            sort: SortOrder::Oldest,
            ..Default::default()
        };
        assert_eq!(slugs(repo.list(&oldest, 0, 10).await.unwrap()), vec!["gamma", "beta", "alpha"]);

        let by_title = BlogFilter {
            sort: SortOrder::Title,
            ..Default::default()
        };
        assert_eq!(slugs(repo.list(&by_title, 0, 10).await.unwrap()), vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_list_by_author() {
        let (pool, repo) = setup_test_repo().await;
        pool.execute("INSERT INTO authors (name, slug) VALUES ('Ann', 'ann')").await.unwrap();

        let mut blog = new_blog("By Ann", "by-ann", true, 0);
        blog.author_id = Some(1);
        repo.create(&blog).await.unwrap();
        repo.create(&new_blog("Anonymous", "anon", true, 0)).await.unwrap();

        let filter = BlogFilter {
            author_id: Some(1),
            ..Default::default()
        };
        let items = repo.list(&filter, 0, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug, "by-ann");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_pool, repo) = setup_test_repo().await;
        let mut blog = repo.create(&new_blog("Draft", "draft", false, 0)).await.unwrap();

        blog.title = "Published".to_string();
        blog.published = true;
        blog.published_at = Some(Utc::now());
        let updated = repo.update(&blog).await.unwrap();
        assert_eq!(updated.title, "Published");
        assert!(updated.published);

        assert!(repo.delete(blog.id).await.unwrap());
        assert!(repo.get_by_id(blog.id).await.unwrap().is_none());
    }
}

//! Author repository

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::Author;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const AUTHOR_COLUMNS: &str = "id, name, slug, bio, avatar_url, created_at, updated_at";

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Insert an author; `author.id` is ignored and the stored row is returned
    async fn create(&self, author: &Author) -> Result<Author>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Author>>;

    /// List authors ordered by name
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Author>>;

    async fn count(&self) -> Result<i64>;

    /// Persist every field of an existing author
    async fn update(&self, author: &Author) -> Result<Author>;

    /// Returns false when no row was deleted
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Whether `slug` is taken by an author other than `exclude_id`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based author repository (SQLite and MySQL)
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn create(&self, author: &Author) -> Result<Author> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_author_sqlite(sqlite(&self.pool)?, author).await,
            DatabaseDriver::Mysql => create_author_mysql(mysql(&self.pool)?, author).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_author_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_author_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_author_by_slug_sqlite(sqlite(&self.pool)?, slug).await,
            DatabaseDriver::Mysql => get_author_by_slug_mysql(mysql(&self.pool)?, slug).await,
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_authors_sqlite(sqlite(&self.pool)?, offset, limit).await,
            DatabaseDriver::Mysql => list_authors_mysql(mysql(&self.pool)?, offset, limit).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM authors";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count authors")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count authors")?
                .get("count"),
        };
        Ok(count)
    }

    async fn update(&self, author: &Author) -> Result<Author> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_author_sqlite(sqlite(&self.pool)?, author).await,
            DatabaseDriver::Mysql => update_author_mysql(mysql(&self.pool)?, author).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM authors WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete author")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete author")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM authors WHERE slug = ? AND id <> ?";
        let exclude = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to check author slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to check author slug")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_author_sqlite(pool: &SqlitePool, author: &Author) -> Result<Author> {
    let result = sqlx::query(
        "INSERT INTO authors (name, slug, bio, avatar_url, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&author.name)
    .bind(&author.slug)
    .bind(&author.bio)
    .bind(&author.avatar_url)
    .bind(author.created_at)
    .bind(author.updated_at)
    .execute(pool)
    .await
    .context("Failed to create author")?;

    Ok(Author {
        id: result.last_insert_rowid(),
        ..author.clone()
    })
}

async fn get_author_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Author>> {
    let row = sqlx::query(&format!("SELECT {} FROM authors WHERE id = ?", AUTHOR_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by ID")?;

    Ok(row.as_ref().map(row_to_author_sqlite))
}

async fn get_author_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Author>> {
    let row = sqlx::query(&format!("SELECT {} FROM authors WHERE slug = ?", AUTHOR_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by slug")?;

    Ok(row.as_ref().map(row_to_author_sqlite))
}

async fn list_authors_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Author>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM authors ORDER BY name ASC, id ASC LIMIT ? OFFSET ?",
        AUTHOR_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list authors")?;

    Ok(rows.iter().map(row_to_author_sqlite).collect())
}

async fn update_author_sqlite(pool: &SqlitePool, author: &Author) -> Result<Author> {
    sqlx::query(
        "UPDATE authors SET name = ?, slug = ?, bio = ?, avatar_url = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&author.name)
    .bind(&author.slug)
    .bind(&author.bio)
    .bind(&author.avatar_url)
    .bind(author.updated_at)
    .bind(author.id)
    .execute(pool)
    .await
    .context("Failed to update author")?;

    get_author_by_id_sqlite(pool, author.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Author not found after update"))
}

fn row_to_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> Author {
    Author {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_author_mysql(pool: &MySqlPool, author: &Author) -> Result<Author> {
    let result = sqlx::query(
        "INSERT INTO authors (name, slug, bio, avatar_url, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&author.name)
    .bind(&author.slug)
    .bind(&author.bio)
    .bind(&author.avatar_url)
    .bind(author.created_at)
    .bind(author.updated_at)
    .execute(pool)
    .await
    .context("Failed to create author")?;

    Ok(Author {
        id: result.last_insert_id() as i64,
        ..author.clone()
    })
}

async fn get_author_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Author>> {
    let row = sqlx::query(&format!("SELECT {} FROM authors WHERE id = ?", AUTHOR_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by ID")?;

    Ok(row.as_ref().map(row_to_author_mysql))
}

async fn get_author_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Author>> {
    let row = sqlx::query(&format!("SELECT {} FROM authors WHERE slug = ?", AUTHOR_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by slug")?;

    Ok(row.as_ref().map(row_to_author_mysql))
}

async fn list_authors_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<Author>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM authors ORDER BY name ASC, id ASC LIMIT ? OFFSET ?",
        AUTHOR_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list authors")?;

    Ok(rows.iter().map(row_to_author_mysql).collect())
}

async fn update_author_mysql(pool: &MySqlPool, author: &Author) -> Result<Author> {
    sqlx::query(
        "UPDATE authors SET name = ?, slug = ?, bio = ?, avatar_url = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&author.name)
    .bind(&author.slug)
    .bind(&author.bio)
    .bind(&author.avatar_url)
    .bind(author.updated_at)
    .bind(author.id)
    .execute(pool)
    .await
    .context("Failed to update author")?;

    get_author_by_id_mysql(pool, author.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Author not found after update"))
}

fn row_to_author_mysql(row: &sqlx::mysql::MySqlRow) -> Author {
    Author {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

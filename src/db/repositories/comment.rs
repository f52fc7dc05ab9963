//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithDocument};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment; `comment.id` is ignored
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on a document, newest first
    async fn list_by_document(&self, document_id: i64, offset: i64, limit: i64) -> Result<Vec<Comment>>;

    async fn count_by_document(&self, document_id: i64) -> Result<i64>;

    /// Comments across all documents, newest first
    async fn list_recent(&self, offset: i64, limit: i64) -> Result<Vec<CommentWithDocument>>;

    async fn count(&self) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Delete every comment on a document, returning how many were removed
    async fn delete_by_document(&self, document_id: i64) -> Result<u64>;
}

/// Comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(sqlite(&self.pool)?, comment).await,
            DatabaseDriver::Mysql => create_mysql(mysql(&self.pool)?, comment).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn list_by_document(&self, document_id: i64, offset: i64, limit: i64) -> Result<Vec<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_document_sqlite(sqlite(&self.pool)?, document_id, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_by_document_mysql(mysql(&self.pool)?, document_id, offset, limit).await
            }
        }
    }

    async fn count_by_document(&self, document_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM comments WHERE document_id = ?";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(document_id)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count comments")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(document_id)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count comments")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list_recent(&self, offset: i64, limit: i64) -> Result<Vec<CommentWithDocument>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_recent_sqlite(sqlite(&self.pool)?, offset, limit).await,
            DatabaseDriver::Mysql => list_recent_mysql(mysql(&self.pool)?, offset, limit).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM comments";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count comments")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count comments")?
                .get("count"),
        };
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete_by_document(&self, document_id: i64) -> Result<u64> {
        let sql = "DELETE FROM comments WHERE document_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(document_id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete document comments")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(document_id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete document comments")?
                .rows_affected(),
        };
        Ok(affected)
    }
}

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query(
        "INSERT INTO comments (document_id, name, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(comment.document_id)
    .bind(&comment.name)
    .bind(&comment.content)
    .bind(comment.created_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        ..comment.clone()
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT id, document_id, name, content, created_at FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;
    Ok(row.as_ref().map(row_to_comment_sqlite))
}

async fn list_by_document_sqlite(pool: &SqlitePool, document_id: i64, offset: i64, limit: i64) -> Result<Vec<Comment>> {
    let rows = sqlx::query(
        r#"
        SELECT id, document_id, name, content, created_at FROM comments
        WHERE document_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(document_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;
    Ok(rows.iter().map(row_to_comment_sqlite).collect())
}

async fn list_recent_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<CommentWithDocument>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.document_id, c.name, c.content, c.created_at,
               d.title AS document_title, d.slug AS document_slug
        FROM comments c
        JOIN documents d ON d.id = c.document_id
        ORDER BY c.created_at DESC, c.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list recent comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithDocument {
            comment: row_to_comment_sqlite(row),
            document_title: row.get("document_title"),
            document_slug: row.get("document_slug"),
        })
        .collect())
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        document_id: row.get("document_id"),
        name: row.get("name"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query(
        "INSERT INTO comments (document_id, name, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(comment.document_id)
    .bind(&comment.name)
    .bind(&comment.content)
    .bind(comment.created_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        ..comment.clone()
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT id, document_id, name, content, created_at FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;
    Ok(row.as_ref().map(row_to_comment_mysql))
}

async fn list_by_document_mysql(pool: &MySqlPool, document_id: i64, offset: i64, limit: i64) -> Result<Vec<Comment>> {
    let rows = sqlx::query(
        r#"
        SELECT id, document_id, name, content, created_at FROM comments
        WHERE document_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(document_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;
    Ok(rows.iter().map(row_to_comment_mysql).collect())
}

async fn list_recent_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<CommentWithDocument>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.document_id, c.name, c.content, c.created_at,
               d.title AS document_title, d.slug AS document_slug
        FROM comments c
        JOIN documents d ON d.id = c.document_id
        ORDER BY c.created_at DESC, c.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list recent comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithDocument {
            comment: row_to_comment_mysql(row),
            document_title: row.get("document_title"),
            document_slug: row.get("document_slug"),
        })
        .collect())
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        document_id: row.get("document_id"),
        name: row.get("name"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn setup() -> (DynDatabasePool, SqlxCommentRepository) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        pool.execute("INSERT INTO documents (title, slug, file_url) VALUES ('Doc A', 'doc-a', 'https://x/a.pdf')")
            .await
            .unwrap();
        pool.execute("INSERT INTO documents (title, slug, file_url) VALUES ('Doc B', 'doc-b', 'https://x/b.pdf')")
            .await
            .unwrap();
        let repo = SqlxCommentRepository::new(pool.clone());
        (pool, repo)
    }

    fn comment(document_id: i64, name: &str, age_minutes: i64) -> Comment {
        Comment {
            id: 0,
            document_id,
            name: name.to_string(),
            content: format!("{} says hi", name),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn test_list_by_document_newest_first() {
        let (_pool, repo) = setup().await;
        repo.create(&comment(1, "old", 10)).await.unwrap();
        repo.create(&comment(1, "new", 1)).await.unwrap();
        repo.create(&comment(2, "elsewhere", 5)).await.unwrap();

        let items = repo.list_by_document(1, 0, 10).await.unwrap();
        let names: Vec<_> = items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["new", "old"]);
        assert_eq!(repo.count_by_document(1).await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_recent_includes_document() {
        let (_pool, repo) = setup().await;
        repo.create(&comment(2, "bob", 1)).await.unwrap();

        let recent = repo.list_recent(0, 5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].document_slug, "doc-b");
        assert_eq!(recent[0].document_title, "Doc B");
    }

    #[tokio::test]
    async fn test_insert_for_missing_document_fails() {
        let (_pool, repo) = setup().await;
        assert!(repo.create(&comment(99, "ghost", 0)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_delete_by_document() {
        let (_pool, repo) = setup().await;
        let c = repo.create(&comment(1, "a", 0)).await.unwrap();
        repo.create(&comment(1, "b", 0)).await.unwrap();
        repo.create(&comment(2, "c", 0)).await.unwrap();

        assert!(repo.delete(c.id).await.unwrap());
        assert!(repo.get_by_id(c.id).await.unwrap().is_none());

        assert_eq!(repo.delete_by_document(1).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}

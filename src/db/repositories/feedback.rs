//! Feedback repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Feedback, FeedbackCounts, FeedbackStatus};

const FEEDBACK_COLUMNS: &str = "id, name, description, contact, status, created_at, updated_at";

/// Feedback repository trait
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Insert an entry; `feedback.id` is ignored
    async fn create(&self, feedback: &Feedback) -> Result<Feedback>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Feedback>>;

    /// Entries newest first, optionally restricted to one status
    async fn list(&self, status: Option<FeedbackStatus>, offset: i64, limit: i64) -> Result<Vec<Feedback>>;

    async fn count(&self, status: Option<FeedbackStatus>) -> Result<i64>;

    /// Entry counts for every status
    async fn count_by_status(&self) -> Result<FeedbackCounts>;

    /// Returns false when the entry does not exist
    async fn update_status(&self, id: i64, status: FeedbackStatus, at: DateTime<Utc>) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based feedback repository (SQLite and MySQL)
pub struct SqlxFeedbackRepository {
    pool: DynDatabasePool,
}

impl SqlxFeedbackRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FeedbackRepository> {
        Arc::new(Self::new(pool))
    }
}

fn status_filter(status: Option<FeedbackStatus>) -> String {
    match status {
        // Status values are fixed identifiers, never user text
        Some(s) => format!(" WHERE status = '{}'", s.as_str()),
        None => String::new(),
    }
}

#[async_trait]
impl FeedbackRepository for SqlxFeedbackRepository {
    async fn create(&self, feedback: &Feedback) -> Result<Feedback> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_feedback_sqlite(sqlite(&self.pool)?, feedback).await,
            DatabaseDriver::Mysql => create_feedback_mysql(mysql(&self.pool)?, feedback).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Feedback>> {
        let sql = format!("SELECT {} FROM feedback WHERE id = ?", FEEDBACK_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get feedback")?;
                Ok(row.as_ref().map(row_to_feedback_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get feedback")?;
                Ok(row.as_ref().map(row_to_feedback_mysql))
            }
        }
    }

    async fn list(&self, status: Option<FeedbackStatus>, offset: i64, limit: i64) -> Result<Vec<Feedback>> {
        let sql = format!(
            "SELECT {} FROM feedback{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            FEEDBACK_COLUMNS,
            status_filter(status)
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context("Failed to list feedback")?;
                Ok(rows.iter().map(row_to_feedback_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list feedback")?;
                Ok(rows.iter().map(row_to_feedback_mysql).collect())
            }
        }
    }

    async fn count(&self, status: Option<FeedbackStatus>) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS count FROM feedback{}", status_filter(status));
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count feedback")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count feedback")?
                .get("count"),
        };
        Ok(count)
    }

    async fn count_by_status(&self) -> Result<FeedbackCounts> {
        let sql = "SELECT status, COUNT(*) AS count FROM feedback GROUP BY status";
        let pairs: Vec<(String, i64)> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_all(sqlite(&self.pool)?)
                .await
                .context("Failed to count feedback by status")?
                .iter()
                .map(|row| (row.get("status"), row.get("count")))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_all(mysql(&self.pool)?)
                .await
                .context("Failed to count feedback by status")?
                .iter()
                .map(|row| (row.get("status"), row.get("count")))
                .collect(),
        };

        let mut counts = FeedbackCounts::default();
        for (status, count) in pairs {
            match status.parse::<FeedbackStatus>() {
                Ok(FeedbackStatus::Pending) => counts.pending += count,
                Ok(FeedbackStatus::Reviewed) => counts.reviewed += count,
                Ok(FeedbackStatus::Resolved) => counts.resolved += count,
                Err(e) => tracing::warn!("Ignoring feedback rows: {}", e),
            }
        }
        Ok(counts)
    }

    async fn update_status(&self, id: i64, status: FeedbackStatus, at: DateTime<Utc>) -> Result<bool> {
        let sql = "UPDATE feedback SET status = ?, updated_at = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(status.as_str())
                .bind(at)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to update feedback status")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(status.as_str())
                .bind(at)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to update feedback status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM feedback WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete feedback")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete feedback")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_feedback_sqlite(pool: &SqlitePool, feedback: &Feedback) -> Result<Feedback> {
    let result = sqlx::query(
        "INSERT INTO feedback (name, description, contact, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&feedback.name)
    .bind(&feedback.description)
    .bind(&feedback.contact)
    .bind(feedback.status.as_str())
    .bind(feedback.created_at)
    .bind(feedback.updated_at)
    .execute(pool)
    .await
    .context("Failed to create feedback")?;

    Ok(Feedback {
        id: result.last_insert_rowid(),
        ..feedback.clone()
    })
}

fn row_to_feedback_sqlite(row: &sqlx::sqlite::SqliteRow) -> Feedback {
    let status: String = row.get("status");
    Feedback {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        contact: row.get("contact"),
        status: status.parse().unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_feedback_mysql(pool: &MySqlPool, feedback: &Feedback) -> Result<Feedback> {
    let result = sqlx::query(
        "INSERT INTO feedback (name, description, contact, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&feedback.name)
    .bind(&feedback.description)
    .bind(&feedback.contact)
    .bind(feedback.status.as_str())
    .bind(feedback.created_at)
    .bind(feedback.updated_at)
    .execute(pool)
    .await
    .context("Failed to create feedback")?;

    Ok(Feedback {
        id: result.last_insert_id() as i64,
        ..feedback.clone()
    })
}

fn row_to_feedback_mysql(row: &sqlx::mysql::MySqlRow) -> Feedback {
    let status: String = row.get("status");
    Feedback {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        contact: row.get("contact"),
        status: status.parse().unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxFeedbackRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxFeedbackRepository::new(pool)
    }

    fn entry(name: &str) -> Feedback {
        let now = Utc::now();
        Feedback {
            id: 0,
            name: name.to_string(),
            description: "The PDF viewer is blank".to_string(),
            contact: String::new(),
            status: FeedbackStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_status_filter_and_counts() {
        let repo = setup().await;
        let a = repo.create(&entry("a")).await.unwrap();
        repo.create(&entry("b")).await.unwrap();
        let c = repo.create(&entry("c")).await.unwrap();

        assert!(repo.update_status(a.id, FeedbackStatus::Resolved, Utc::now()).await.unwrap());
        assert!(repo.update_status(c.id, FeedbackStatus::Reviewed, Utc::now()).await.unwrap());
        assert!(!repo.update_status(999, FeedbackStatus::Reviewed, Utc::now()).await.unwrap());

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts, FeedbackCounts { pending: 1, reviewed: 1, resolved: 1 });
        assert_eq!(counts.total(), 3);

        let resolved = repo.list(Some(FeedbackStatus::Resolved), 0, 10).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "a");
        assert_eq!(repo.count(Some(FeedbackStatus::Pending)).await.unwrap(), 1);
        assert_eq!(repo.count(None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        let a = repo.create(&entry("a")).await.unwrap();
        assert!(repo.delete(a.id).await.unwrap());
        assert!(repo.get_by_id(a.id).await.unwrap().is_none());
        assert!(!repo.delete(a.id).await.unwrap());
    }
}

//! Quiz repository
//!
//! Questions are embedded in the quiz row as a JSON array.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::query::{bind_mysql, bind_sqlite, WhereClause};
use crate::db::DynDatabasePool;
use crate::models::{CategoryCount, Question, Quiz, QuizFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const QUIZ_COLUMNS: &str = "id, title, slug, description, category, questions, created_at, updated_at";

/// Quiz repository trait
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert a quiz; `quiz.id` is ignored and the stored row is returned
    async fn create(&self, quiz: &Quiz) -> Result<Quiz>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Quiz>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Quiz>>;

    /// List quizzes matching `filter`, ordered by `filter.sort`
    async fn list(&self, filter: &QuizFilter, offset: i64, limit: i64) -> Result<Vec<Quiz>>;

    /// Count quizzes matching `filter`
    async fn count(&self, filter: &QuizFilter) -> Result<i64>;

    /// Every quiz in a category (exact match), oldest first
    async fn list_by_category(&self, category: &str) -> Result<Vec<Quiz>>;

    /// Categories with their quiz counts, alphabetical
    async fn list_categories(&self) -> Result<Vec<CategoryCount>>;

    /// Total number of questions across all quizzes
    async fn count_questions(&self) -> Result<i64>;

    /// Persist every field of an existing quiz
    async fn update(&self, quiz: &Quiz) -> Result<Quiz>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Whether `slug` is taken by a quiz other than `exclude_id`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based quiz repository (SQLite and MySQL)
pub struct SqlxQuizRepository {
    pool: DynDatabasePool,
}

impl SqlxQuizRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn QuizRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_where(&self, clause: &WhereClause, tail: &str, context: &'static str) -> Result<Vec<Quiz>> {
        let sql = format!("SELECT {} FROM quizzes{} {}", QUIZ_COLUMNS, clause.to_sql(), tail);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), clause.binds())
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context(context)?;
                rows.iter().map(row_to_quiz_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), clause.binds())
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context(context)?;
                rows.iter().map(row_to_quiz_mysql).collect()
            }
        }
    }
}

fn quiz_where(filter: &QuizFilter) -> WhereClause {
    let mut clause = WhereClause::new();
    if let Some(category) = filter.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        clause.eq_text("category", category);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        clause.search(&["title", "description", "category"], search);
    }
    clause
}

fn questions_to_json(questions: &[Question]) -> Result<String> {
    serde_json::to_string(questions).context("Failed to serialize quiz questions")
}

fn questions_from_json(raw: &str, slug: &str) -> Result<Vec<Question>> {
    serde_json::from_str(raw).with_context(|| format!("Corrupt questions for quiz '{}'", slug))
}

#[async_trait]
impl QuizRepository for SqlxQuizRepository {
    async fn create(&self, quiz: &Quiz) -> Result<Quiz> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_quiz_sqlite(sqlite(&self.pool)?, quiz).await,
            DatabaseDriver::Mysql => create_quiz_mysql(mysql(&self.pool)?, quiz).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Quiz>> {
        let mut clause = WhereClause::new();
        clause.eq_int("id", id);
        Ok(self
            .fetch_where(&clause, "", "Failed to get quiz by ID")
            .await?
            .into_iter()
            .next())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Quiz>> {
        let mut clause = WhereClause::new();
        clause.eq_text("slug", slug);
        Ok(self
            .fetch_where(&clause, "", "Failed to get quiz by slug")
            .await?
            .into_iter()
            .next())
    }

    async fn list(&self, filter: &QuizFilter, offset: i64, limit: i64) -> Result<Vec<Quiz>> {
        let clause = quiz_where(filter);
        let tail = format!("{} LIMIT {} OFFSET {}", filter.sort.order_by(false), limit.max(0), offset.max(0));
        self.fetch_where(&clause, &tail, "Failed to list quizzes").await
    }

    async fn count(&self, filter: &QuizFilter) -> Result<i64> {
        let clause = quiz_where(filter);
        let sql = format!("SELECT COUNT(*) AS count FROM quizzes{}", clause.to_sql());
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), clause.binds())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count quizzes")?
                .get("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), clause.binds())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count quizzes")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Quiz>> {
        let mut clause = WhereClause::new();
        clause.eq_text("category", category);
        self.fetch_where(&clause, "ORDER BY created_at ASC, id ASC", "Failed to list quizzes by category")
            .await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryCount>> {
        let sql = "SELECT category, COUNT(*) AS quiz_count FROM quizzes GROUP BY category ORDER BY category ASC";
        let categories = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_all(sqlite(&self.pool)?)
                .await
                .context("Failed to list quiz categories")?
                .iter()
                .map(|row| CategoryCount {
                    category: row.get("category"),
                    quiz_count: row.get("quiz_count"),
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_all(mysql(&self.pool)?)
                .await
                .context("Failed to list quiz categories")?
                .iter()
                .map(|row| CategoryCount {
                    category: row.get("category"),
                    quiz_count: row.get("quiz_count"),
                })
                .collect(),
        };
        Ok(categories)
    }

    async fn count_questions(&self) -> Result<i64> {
        let total = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COALESCE(SUM(json_array_length(questions)), 0) FROM quizzes",
                )
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count quiz questions")?
            }
            DatabaseDriver::Mysql => {
                // SUM yields DECIMAL on MySQL
                sqlx::query_scalar::<_, i64>(
                    "SELECT CAST(COALESCE(SUM(JSON_LENGTH(questions)), 0) AS SIGNED) FROM quizzes",
                )
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count quiz questions")?
            }
        };
        Ok(total)
    }

    async fn update(&self, quiz: &Quiz) -> Result<Quiz> {
        let sql = r#"
            UPDATE quizzes
            SET title = ?, slug = ?, description = ?, category = ?, questions = ?, updated_at = ?
            WHERE id = ?
        "#;
        let questions = questions_to_json(&quiz.questions)?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&quiz.title)
                    .bind(&quiz.slug)
                    .bind(&quiz.description)
                    .bind(&quiz.category)
                    .bind(&questions)
                    .bind(quiz.updated_at)
                    .bind(quiz.id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to update quiz")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&quiz.title)
                    .bind(&quiz.slug)
                    .bind(&quiz.description)
                    .bind(&quiz.category)
                    .bind(&questions)
                    .bind(quiz.updated_at)
                    .bind(quiz.id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to update quiz")?;
            }
        }

        self.get_by_id(quiz.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Quiz not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM quizzes WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete quiz")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete quiz")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM quizzes WHERE slug = ? AND id <> ?";
        let exclude = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to check quiz slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to check quiz slug")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_quiz_sqlite(pool: &SqlitePool, quiz: &Quiz) -> Result<Quiz> {
    let questions = questions_to_json(&quiz.questions)?;
    let result = sqlx::query(
        r#"
        INSERT INTO quizzes (title, slug, description, category, questions, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&quiz.title)
    .bind(&quiz.slug)
    .bind(&quiz.description)
    .bind(&quiz.category)
    .bind(&questions)
    .bind(quiz.created_at)
    .bind(quiz.updated_at)
    .execute(pool)
    .await
    .context("Failed to create quiz")?;

    Ok(Quiz {
        id: result.last_insert_rowid(),
        ..quiz.clone()
    })
}

fn row_to_quiz_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Quiz> {
    let slug: String = row.get("slug");
    let questions: String = row.get("questions");
    Ok(Quiz {
        id: row.get("id"),
        title: row.get("title"),
        questions: questions_from_json(&questions, &slug)?,
        slug,
        description: row.get("description"),
        category: row.get("category"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_quiz_mysql(pool: &MySqlPool, quiz: &Quiz) -> Result<Quiz> {
    let questions = questions_to_json(&quiz.questions)?;
    let result = sqlx::query(
        r#"
        INSERT INTO quizzes (title, slug, description, category, questions, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&quiz.title)
    .bind(&quiz.slug)
    .bind(&quiz.description)
    .bind(&quiz.category)
    .bind(&questions)
    .bind(quiz.created_at)
    .bind(quiz.updated_at)
    .execute(pool)
    .await
    .context("Failed to create quiz")?;

    Ok(Quiz {
        id: result.last_insert_id() as i64,
        ..quiz.clone()
    })
}

fn row_to_quiz_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Quiz> {
    let slug: String = row.get("slug");
    let questions: String = row.get("questions");
    Ok(Quiz {
        id: row.get("id"),
        title: row.get("title"),
        questions: questions_from_json(&questions, &slug)?,
        slug,
        description: row.get("description"),
        category: row.get("category"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup_test_repo() -> SqlxQuizRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxQuizRepository::new(pool)
    }

    fn new_quiz(slug: &str, category: &str, question_count: usize) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: 0,
            title: format!("Quiz {}", slug),
            slug: slug.to_string(),
            description: String::new(),
            category: category.to_string(),
            questions: (0..question_count)
                .map(|i| Question::new(format!("Q{}", i), &["a", "b", "c"], "a"))
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_roundtrips_questions() {
        let repo = setup_test_repo().await;
        let created = repo.create(&new_quiz("basics", "math", 3)).await.unwrap();

        let found = repo.get_by_slug("basics").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.questions, created.questions);
    }

    #[tokio::test]
    async fn test_categories_and_question_count() {
        let repo = setup_test_repo().await;
        repo.create(&new_quiz("m1", "math", 2)).await.unwrap();
        repo.create(&new_quiz("m2", "math", 3)).await.unwrap();
        repo.create(&new_quiz("p1", "physics", 4)).await.unwrap();

        let categories = repo.list_categories().await.unwrap();
        assert_eq!(
            categories,
            vec![
                CategoryCount { category: "math".into(), quiz_count: 2 },
                CategoryCount { category: "physics".into(), quiz_count: 1 },
            ]
        );
        assert_eq!(repo.count_questions().await.unwrap(), 9);
        assert_eq!(repo.list_by_category("math").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_count_questions_empty_table() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.count_questions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filter_and_count_agree() {
        let repo = setup_test_repo().await;
        repo.create(&new_quiz("algebra", "math", 1)).await.unwrap();
        repo.create(&new_quiz("geometry", "math", 1)).await.unwrap();
        repo.create(&new_quiz("waves", "physics", 1)).await.unwrap();

        let filter = QuizFilter {
            category: Some("math".into()),
            search: Some("geo".into()),
            ..Default::default()
        };
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
        let items = repo.list(&filter, 0, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug, "geometry");

        let page = repo.list(&QuizFilter::default(), 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let mut quiz = repo.create(&new_quiz("q", "math", 1)).await.unwrap();

        quiz.questions.push(Question::new("New?", &["yes", "no"], "yes"));
        quiz.category = "logic".into();
        let updated = repo.update(&quiz).await.unwrap();
        assert_eq!(updated.questions.len(), 2);
        assert_eq!(updated.category, "logic");

        assert!(repo.delete(quiz.id).await.unwrap());
        assert!(repo.get_by_id(quiz.id).await.unwrap().is_none());
    }
}

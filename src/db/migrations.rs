//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings with one variant per
//! driver, and tracked in the `_migrations` table.
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::pool::{mysql, sqlite};
use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All StudyVault migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_authors",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                bio TEXT NOT NULL DEFAULT '',
                avatar_url VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS authors (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                bio TEXT NOT NULL,
                avatar_url VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            ) CHARACTER SET utf8mb4;
        "#,
    },
    Migration {
        version: 2,
        name: "create_blogs",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS blogs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                excerpt VARCHAR(500) NOT NULL DEFAULT '',
                content TEXT NOT NULL,
                content_html TEXT NOT NULL,
                author_id INTEGER,
                published BOOLEAN NOT NULL DEFAULT 0,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_blogs_author_id ON blogs(author_id);
            CREATE INDEX IF NOT EXISTS idx_blogs_published ON blogs(published, created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS blogs (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                excerpt VARCHAR(500) NOT NULL DEFAULT '',
                content MEDIUMTEXT NOT NULL,
                content_html MEDIUMTEXT NOT NULL,
                author_id BIGINT,
                published BOOLEAN NOT NULL DEFAULT FALSE,
                published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE SET NULL
            ) CHARACTER SET utf8mb4;
            CREATE INDEX idx_blogs_author_id ON blogs(author_id);
            CREATE INDEX idx_blogs_published ON blogs(published, created_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_documents",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                doc_type VARCHAR(30) NOT NULL DEFAULT 'notes',
                subject VARCHAR(120) NOT NULL DEFAULT '',
                university VARCHAR(120) NOT NULL DEFAULT '',
                year INTEGER,
                file_url VARCHAR(500) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '[]',
                view_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_documents_subject ON documents(subject);
            CREATE INDEX IF NOT EXISTS idx_documents_university ON documents(university);
            CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(doc_type);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS documents (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                doc_type VARCHAR(30) NOT NULL DEFAULT 'notes',
                subject VARCHAR(120) NOT NULL DEFAULT '',
                university VARCHAR(120) NOT NULL DEFAULT '',
                year INT,
                file_url VARCHAR(500) NOT NULL,
                description TEXT NOT NULL,
                tags TEXT NOT NULL,
                view_count BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            ) CHARACTER SET utf8mb4;
            CREATE INDEX idx_documents_subject ON documents(subject);
            CREATE INDEX idx_documents_university ON documents(university);
            CREATE INDEX idx_documents_type ON documents(doc_type);
        "#,
    },
    Migration {
        version: 4,
        name: "create_comments",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL,
                name VARCHAR(50) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_document_id ON comments(document_id, created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                document_id BIGINT NOT NULL,
                name VARCHAR(50) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            ) CHARACTER SET utf8mb4;
            CREATE INDEX idx_comments_document_id ON comments(document_id, created_at);
        "#,
    },
    Migration {
        version: 5,
        name: "create_quizzes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS quizzes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                category VARCHAR(100) NOT NULL,
                questions TEXT NOT NULL DEFAULT '[]',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_quizzes_category ON quizzes(category);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS quizzes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                description TEXT NOT NULL,
                category VARCHAR(100) NOT NULL,
                questions MEDIUMTEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            ) CHARACTER SET utf8mb4;
            CREATE INDEX idx_quizzes_category ON quizzes(category);
        "#,
    },
    Migration {
        version: 6,
        name: "create_feedback",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                description TEXT NOT NULL,
                contact VARCHAR(200) NOT NULL DEFAULT '',
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_feedback_status ON feedback(status, created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                description TEXT NOT NULL,
                contact VARCHAR(200) NOT NULL DEFAULT '',
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            ) CHARACTER SET utf8mb4;
            CREATE INDEX idx_feedback_status ON feedback(status, created_at);
        "#,
    },
];

/// Run all pending migrations.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i64> = applied.iter().map(|m| m.version).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&i64::from(migration.version)) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(sqlite(pool)?).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(mysql(pool)?).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(sqlite(pool)?, migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(mysql(pool)?, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;

    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

// MySQL commits DDL implicitly, so statements run one by one outside a transaction.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    if sql.chars().count() > 100 {
        format!("{}...", sql.chars().take(100).collect::<String>())
    } else {
        sql.to_string()
    }
}

/// Split SQL into individual statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn table_columns(pool: &DynDatabasePool, table: &str) -> Vec<String> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
            .fetch_all(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        rows.iter().map(|r| r.get::<String, _>("name")).collect()
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, MIGRATIONS.len());

        // Second run is a no-op
        let applied = run_migrations(&pool).await.unwrap();
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn test_is_up_to_date_and_pending_count() {
        let pool = create_test_pool().await.unwrap();

        assert!(!is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        run_migrations(&pool).await.unwrap();

        assert!(is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tables_created() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let quiz_cols = table_columns(&pool, "quizzes").await;
        for col in ["id", "title", "slug", "category", "questions"] {
            assert!(quiz_cols.contains(&col.to_string()), "quizzes.{} missing", col);
        }

        let doc_cols = table_columns(&pool, "documents").await;
        for col in ["doc_type", "subject", "university", "year", "file_url", "tags", "view_count"] {
            assert!(doc_cols.contains(&col.to_string()), "documents.{} missing", col);
        }

        for table in ["authors", "blogs", "comments", "feedback"] {
            assert!(!table_columns(&pool, table).await.is_empty(), "{} missing", table);
        }
    }

    #[tokio::test]
    async fn test_comments_cascade_with_document() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        pool.execute("INSERT INTO documents (title, slug, file_url) VALUES ('Doc', 'doc', 'https://x/doc.pdf')")
            .await
            .unwrap();
        pool.execute("INSERT INTO comments (document_id, name, content) VALUES (1, 'a', 'b')")
            .await
            .unwrap();

        pool.execute("DELETE FROM documents WHERE id = 1").await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_blog_author_set_null() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        pool.execute("INSERT INTO authors (name, slug) VALUES ('Ann', 'ann')").await.unwrap();
        pool.execute(
            "INSERT INTO blogs (title, slug, content, content_html, author_id) VALUES ('T', 't', '', '', 1)",
        )
        .await
        .unwrap();
        pool.execute("DELETE FROM authors WHERE id = 1").await.unwrap();

        let author_id: Option<i64> = sqlx::query_scalar("SELECT author_id FROM blogs WHERE slug = 't'")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert!(author_id.is_none());
    }

    #[tokio::test]
    async fn test_unique_slug_constraint() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        pool.execute("INSERT INTO quizzes (title, slug, category) VALUES ('Q', 'q', 'math')")
            .await
            .unwrap();
        let dup = pool
            .execute("INSERT INTO quizzes (title, slug, category) VALUES ('Q2', 'q', 'math')")
            .await;
        assert!(dup.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT);\n-- comment only\n;\nCREATE INDEX i ON a(id)";
        let statements = split_sql_statements(sql);
        assert_eq!(statements, vec!["CREATE TABLE a (id INT)", "CREATE INDEX i ON a(id)"]);
    }

    #[test]
    fn test_migration_versions_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, i + 1);
        }
    }
}

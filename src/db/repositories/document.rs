//! Document repository
//!
//! Tags are stored as a JSON array in a text column; filtering by tag matches
//! the quoted element inside that text.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::query::{bind_mysql, bind_sqlite, WhereClause};
use crate::db::DynDatabasePool;
use crate::models::{Document, DocumentFilter, DocumentType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const DOCUMENT_COLUMNS: &str = "id, title, slug, doc_type, subject, university, year, file_url, description, tags, view_count, created_at, updated_at";

/// Document repository trait
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a document; `document.id` is ignored and the stored row is returned
    async fn create(&self, document: &Document) -> Result<Document>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Document>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Document>>;

    /// List documents matching `filter`, ordered by `filter.sort`
    async fn list(&self, filter: &DocumentFilter, offset: i64, limit: i64) -> Result<Vec<Document>>;

    /// Count documents matching `filter`
    async fn count(&self, filter: &DocumentFilter) -> Result<i64>;

    /// Persist every field of an existing document (view count excluded)
    async fn update(&self, document: &Document) -> Result<Document>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn increment_view(&self, id: i64) -> Result<()>;

    /// Distinct non-empty subjects, alphabetical
    async fn list_subjects(&self) -> Result<Vec<String>>;

    /// Distinct non-empty universities, alphabetical
    async fn list_universities(&self) -> Result<Vec<String>>;

    /// Newest documents with the same subject, excluding `exclude_id`
    async fn list_related(&self, subject: &str, exclude_id: i64, limit: i64) -> Result<Vec<Document>>;

    /// Whether `slug` is taken by a document other than `exclude_id`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based document repository (SQLite and MySQL)
pub struct SqlxDocumentRepository {
    pool: DynDatabasePool,
}

impl SqlxDocumentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn DocumentRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_where(&self, clause: &WhereClause, tail: &str, context: &'static str) -> Result<Vec<Document>> {
        let sql = format!("SELECT {} FROM documents{} {}", DOCUMENT_COLUMNS, clause.to_sql(), tail);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), clause.binds())
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context(context)?;
                Ok(rows.iter().map(row_to_document_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), clause.binds())
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context(context)?;
                Ok(rows.iter().map(row_to_document_mysql).collect())
            }
        }
    }

    async fn distinct_column(&self, column: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT {col} AS value FROM documents WHERE {col} <> '' ORDER BY {col} ASC",
            col = column
        );
        let values = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(sqlite(&self.pool)?)
                .await
                .with_context(|| format!("Failed to list distinct {}", column))?
                .iter()
                .map(|row| row.get("value"))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(mysql(&self.pool)?)
                .await
                .with_context(|| format!("Failed to list distinct {}", column))?
                .iter()
                .map(|row| row.get("value"))
                .collect(),
        };
        Ok(values)
    }
}

/// Translate a filter into WHERE conditions
fn document_where(filter: &DocumentFilter) -> WhereClause {
    let mut clause = WhereClause::new();
    if let Some(doc_type) = filter.doc_type {
        clause.eq_text("doc_type", doc_type.as_str());
    }
    if let Some(subject) = non_empty(&filter.subject) {
        clause.eq_text("subject", subject);
    }
    if let Some(university) = non_empty(&filter.university) {
        clause.eq_text("university", university);
    }
    if let Some(year) = filter.year {
        clause.eq_int("year", i64::from(year));
    }
    if let Some(tag) = non_empty(&filter.tag) {
        clause.json_array_contains("tags", tag);
    }
    if let Some(search) = non_empty(&filter.search) {
        clause.search(&["title", "description", "subject", "university"], search);
    }
    clause
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn tags_to_json(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).context("Failed to serialize document tags")
}

fn tags_from_json(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[async_trait]
impl DocumentRepository for SqlxDocumentRepository {
    async fn create(&self, document: &Document) -> Result<Document> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_document_sqlite(sqlite(&self.pool)?, document).await,
            DatabaseDriver::Mysql => create_document_mysql(mysql(&self.pool)?, document).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Document>> {
        let mut clause = WhereClause::new();
        clause.eq_int("id", id);
        Ok(self
            .fetch_where(&clause, "", "Failed to get document by ID")
            .await?
            .into_iter()
            .next())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Document>> {
        let mut clause = WhereClause::new();
        clause.eq_text("slug", slug);
        Ok(self
            .fetch_where(&clause, "", "Failed to get document by slug")
            .await?
            .into_iter()
            .next())
    }

    async fn list(&self, filter: &DocumentFilter, offset: i64, limit: i64) -> Result<Vec<Document>> {
        let clause = document_where(filter);
        let tail = format!("{} LIMIT {} OFFSET {}", filter.sort.order_by(true), limit.max(0), offset.max(0));
        self.fetch_where(&clause, &tail, "Failed to list documents").await
    }

    async fn count(&self, filter: &DocumentFilter) -> Result<i64> {
        let clause = document_where(filter);
        let sql = format!("SELECT COUNT(*) AS count FROM documents{}", clause.to_sql());
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), clause.binds())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count documents")?
                .get("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), clause.binds())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count documents")?
                .get("count"),
        };
        Ok(count)
    }

    async fn update(&self, document: &Document) -> Result<Document> {
        let sql = r#"
            UPDATE documents
            SET title = ?, slug = ?, doc_type = ?, subject = ?, university = ?, year = ?,
                file_url = ?, description = ?, tags = ?, updated_at = ?
            WHERE id = ?
        "#;
        let tags = tags_to_json(&document.tags)?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&document.title)
                    .bind(&document.slug)
                    .bind(document.doc_type.as_str())
                    .bind(&document.subject)
                    .bind(&document.university)
                    .bind(document.year)
                    .bind(&document.file_url)
                    .bind(&document.description)
                    .bind(&tags)
                    .bind(document.updated_at)
                    .bind(document.id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to update document")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&document.title)
                    .bind(&document.slug)
                    .bind(document.doc_type.as_str())
                    .bind(&document.subject)
                    .bind(&document.university)
                    .bind(document.year)
                    .bind(&document.file_url)
                    .bind(&document.description)
                    .bind(&tags)
                    .bind(document.updated_at)
                    .bind(document.id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to update document")?;
            }
        }

        self.get_by_id(document.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Document not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM documents WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete document")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete document")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn increment_view(&self, id: i64) -> Result<()> {
        let sql = "UPDATE documents SET view_count = view_count + 1 WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to increment document views")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to increment document views")?;
            }
        }
        Ok(())
    }

    async fn list_subjects(&self) -> Result<Vec<String>> {
        self.distinct_column("subject").await
    }

    async fn list_universities(&self) -> Result<Vec<String>> {
        self.distinct_column("university").await
    }

    async fn list_related(&self, subject: &str, exclude_id: i64, limit: i64) -> Result<Vec<Document>> {
        let mut clause = WhereClause::new();
        clause.eq_text("subject", subject);
        clause.raw(&format!("id <> {}", exclude_id));
        let tail = format!("ORDER BY created_at DESC, id DESC LIMIT {}", limit.max(0));
        self.fetch_where(&clause, &tail, "Failed to list related documents").await
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM documents WHERE slug = ? AND id <> ?";
        let exclude = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to check document slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to check document slug")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_document_sqlite(pool: &SqlitePool, document: &Document) -> Result<Document> {
    let tags = tags_to_json(&document.tags)?;
    let result = sqlx::query(
        r#"
        INSERT INTO documents (title, slug, doc_type, subject, university, year, file_url, description, tags, view_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&document.title)
    .bind(&document.slug)
    .bind(document.doc_type.as_str())
    .bind(&document.subject)
    .bind(&document.university)
    .bind(document.year)
    .bind(&document.file_url)
    .bind(&document.description)
    .bind(&tags)
    .bind(document.created_at)
    .bind(document.updated_at)
    .execute(pool)
    .await
    .context("Failed to create document")?;

    Ok(Document {
        id: result.last_insert_rowid(),
        view_count: 0,
        ..document.clone()
    })
}

fn row_to_document_sqlite(row: &sqlx::sqlite::SqliteRow) -> Document {
    let doc_type: String = row.get("doc_type");
    let tags: String = row.get("tags");
    Document {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        doc_type: doc_type.parse().unwrap_or(DocumentType::Other),
        subject: row.get("subject"),
        university: row.get("university"),
        year: row.get("year"),
        file_url: row.get("file_url"),
        description: row.get("description"),
        tags: tags_from_json(&tags),
        view_count: row.get("view_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_document_mysql(pool: &MySqlPool, document: &Document) -> Result<Document> {
    let tags = tags_to_json(&document.tags)?;
    let result = sqlx::query(
        r#"
        INSERT INTO documents (title, slug, doc_type, subject, university, year, file_url, description, tags, view_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&document.title)
    .bind(&document.slug)
    .bind(document.doc_type.as_str())
    .bind(&document.subject)
    .bind(&document.university)
    .bind(document.year)
    .bind(&document.file_url)
    .bind(&document.description)
    .bind(&tags)
    .bind(document.created_at)
    .bind(document.updated_at)
    .execute(pool)
    .await
    .context("Failed to create document")?;

    Ok(Document {
        id: result.last_insert_id() as i64,
        view_count: 0,
        ..document.clone()
    })
}

fn row_to_document_mysql(row: &sqlx::mysql::MySqlRow) -> Document {
    let doc_type: String = row.get("doc_type");
    let tags: String = row.get("tags");
    Document {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        doc_type: doc_type.parse().unwrap_or(DocumentType::Other),
        subject: row.get("subject"),
        university: row.get("university"),
        year: row.get("year"),
        file_url: row.get("file_url"),
        description: row.get("description"),
        tags: tags_from_json(&tags),
        view_count: row.get("view_count"),
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

    async fn setup_test_repo() -> SqlxDocumentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxDocumentRepository::new(pool)
    }

    fn new_document(slug: &str, subject: &str, university: &str, year: Option<i32>, tags: &[&str]) -> Document {
        let now = Utc::now();
        Document {
            id: 0,
            title: slug.replace('-', " "),
            slug: slug.to_string(),
            doc_type: DocumentType::Notes,
            subject: subject.to_string(),
            university: university.to_string(),
            year,
            file_url: format!("https://files.example.org/{}.pdf", slug),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_roundtrips_tags() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&new_document("mechanics", "Physics", "MIT", Some(2023), &["exam", "semester-1"]))
            .await
            .unwrap();

        let found = repo.get_by_slug("mechanics").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.tags, vec!["exam", "semester-1"]);
        assert_eq!(found.year, Some(2023));
        assert_eq!(found.doc_type, DocumentType::Notes);
    }

    #[tokio::test]
    async fn test_filters_match_counts() {
        let repo = setup_test_repo().await;
        repo.create(&new_document("mech-notes", "Physics", "MIT", Some(2023), &["exam"])).await.unwrap();
        repo.create(&new_document("optics", "Physics", "Oxford", Some(2022), &[])).await.unwrap();
        repo.create(&new_document("algebra", "Maths", "MIT", Some(2023), &["exam", "examples"])).await.unwrap();

        let cases = vec![
            (DocumentFilter { subject: Some("Physics".into()), ..Default::default() }, 2),
            (DocumentFilter { university: Some("MIT".into()), ..Default::default() }, 2),
            (DocumentFilter { year: Some(2023), subject: Some("Physics".into()), ..Default::default() }, 1),
            (DocumentFilter { tag: Some("exam".into()), ..Default::default() }, 2),
            (DocumentFilter { tag: Some("examples".into()), ..Default::default() }, 1),
            (DocumentFilter { search: Some("OPT".into()), ..Default::default() }, 1),
            (DocumentFilter { doc_type: Some(DocumentType::Book), ..Default::default() }, 0),
        ];

        for (filter, expected) in cases {
            let count = repo.count(&filter).await.unwrap();
            let items = repo.list(&filter, 0, 100).await.unwrap();
            assert_eq!(count, expected, "count for {:?}", filter);
            assert_eq!(items.len() as i64, count, "list for {:?}", filter);
        }
    }

    #[tokio::test]
    async fn test_popular_sort_and_views() {
        let repo = setup_test_repo().await;
        let a = repo.create(&new_document("a", "X", "", None, &[])).await.unwrap();
        let b = repo.create(&new_document("b", "X", "", None, &[])).await.unwrap();

        repo.increment_view(b.id).await.unwrap();
        repo.increment_view(b.id).await.unwrap();
        repo.increment_view(a.id).await.unwrap();

        let filter = DocumentFilter {
            sort: SortOrder::Popular,
            ..Default::default()
        };
        let items = repo.list(&filter, 0, 10).await.unwrap();
        assert_eq!(items[0].slug, "b");
        assert_eq!(items[0].view_count, 2);
    }

    #[tokio::test]
    async fn test_distinct_values_and_related() {
        let repo = setup_test_repo().await;
        let mut old = new_document("old", "Physics", "MIT", None, &[]);
        old.created_at = Utc::now() - Duration::days(2);
        repo.create(&old).await.unwrap();
        let current = repo.create(&new_document("current", "Physics", "Oxford", None, &[])).await.unwrap();
        repo.create(&new_document("other", "Maths", "", None, &[])).await.unwrap();

        assert_eq!(repo.list_subjects().await.unwrap(), vec!["Maths", "Physics"]);
        assert_eq!(repo.list_universities().await.unwrap(), vec!["MIT", "Oxford"]);

        let related = repo.list_related("Physics", current.id, 5).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].slug, "old");
    }

    #[tokio::test]
    async fn test_update_keeps_view_count() {
        let repo = setup_test_repo().await;
        let mut doc = repo.create(&new_document("doc", "X", "", None, &[])).await.unwrap();
        repo.increment_view(doc.id).await.unwrap();

        doc.title = "Renamed".into();
        doc.tags = vec!["new".into()];
        let updated = repo.update(&doc).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.tags, vec!["new"]);
        assert_eq!(updated.view_count, 1);
    }
}

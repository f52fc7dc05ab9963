//! Helpers for building filtered list queries
//!
//! List endpoints accept several optional filters. `WhereClause` collects the
//! active conditions as `?` placeholders together with their bind values so
//! the same fragment can be used by both the SQLite and MySQL code paths.

use sqlx::{MySql, Sqlite};

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Int(i64),
}

/// Accumulates `AND`-joined conditions and their bind values
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    binds: Vec<BindValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition with no placeholders
    pub fn raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// Add `column = ?`
    pub fn eq_text(&mut self, column: &str, value: impl Into<String>) -> &mut Self {
        self.conditions.push(format!("{} = ?", column));
        self.binds.push(BindValue::Text(value.into()));
        self
    }

    /// Add `column = ?` for an integer value
    pub fn eq_int(&mut self, column: &str, value: i64) -> &mut Self {
        self.conditions.push(format!("{} = ?", column));
        self.binds.push(BindValue::Int(value));
        self
    }

    /// Case-insensitive substring match over any of `columns`
    pub fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        let parts: Vec<String> = columns
            .iter()
            .map(|c| format!("LOWER({}) LIKE ? ESCAPE '!'", c))
            .collect();
        self.conditions.push(format!("({})", parts.join(" OR ")));
        for _ in columns {
            self.binds.push(BindValue::Text(pattern.clone()));
        }
        self
    }

    /// Match a string element inside a JSON array stored as text
    pub fn json_array_contains(&mut self, column: &str, value: &str) -> &mut Self {
        let needle = serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value));
        self.conditions.push(format!("{} LIKE ? ESCAPE '!'", column));
        self.binds
            .push(BindValue::Text(format!("%{}%", escape_like(&needle))));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as ` WHERE a AND b`, or an empty string when there are no conditions
    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }
}

/// Escape `%`, `_` and the escape character `!` for a LIKE pattern.
///
/// `!` is used instead of a backslash because MySQL treats backslashes in
/// string literals as escapes of their own.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '!') {
            out.push('!');
        }
        out.push(c);
    }
    out
}

/// Bind values onto a SQLite query in order
pub fn bind_sqlite<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    binds: &'q [BindValue],
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for bind in binds {
        query = match bind {
            BindValue::Text(s) => query.bind(s.as_str()),
            BindValue::Int(i) => query.bind(*i),
        };
    }
    query
}

/// Bind values onto a MySQL query in order
pub fn bind_mysql<'q>(
    mut query: sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments>,
    binds: &'q [BindValue],
) -> sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments> {
    for bind in binds {
        query = match bind {
            BindValue::Text(s) => query.bind(s.as_str()),
            BindValue::Int(i) => query.bind(*i),
        };
    }
    query
}

/// Bind values onto a SQLite scalar query in order
pub fn bind_scalar_sqlite<'q, O>(
    mut query: sqlx::query::QueryScalar<'q, Sqlite, O, sqlx::sqlite::SqliteArguments<'q>>,
    binds: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, Sqlite, O, sqlx::sqlite::SqliteArguments<'q>> {
    for bind in binds {
        query = match bind {
            BindValue::Text(s) => query.bind(s.as_str()),
            BindValue::Int(i) => query.bind(*i),
        };
    }
    query
}

/// Bind values onto a MySQL scalar query in order
pub fn bind_scalar_mysql<'q, O>(
    mut query: sqlx::query::QueryScalar<'q, MySql, O, sqlx::mysql::MySqlArguments>,
    binds: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, MySql, O, sqlx::mysql::MySqlArguments> {
    for bind in binds {
        query = match bind {
            BindValue::Text(s) => query.bind(s.as_str()),
            BindValue::Int(i) => query.bind(*i),
        };
    }
    query
}

/// True when the error chain contains a unique-constraint violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_empty_clause_renders_nothing() {
        let clause = WhereClause::new();
        assert!(clause.is_empty());
        assert_eq!(clause.to_sql(), "");
        assert!(clause.binds().is_empty());
    }

    #[test]
    fn test_conditions_joined_with_and() {
        let mut clause = WhereClause::new();
        clause.raw("published = 1").eq_text("subject", "Physics").eq_int("year", 2023);

        assert_eq!(clause.to_sql(), " WHERE published = 1 AND subject = ? AND year = ?");
        assert_eq!(
            clause.binds(),
            &[BindValue::Text("Physics".into()), BindValue::Int(2023)]
        );
    }

    #[test]
    fn test_search_binds_one_pattern_per_column() {
        let mut clause = WhereClause::new();
        clause.search(&["title", "content"], "Rust_1");

        assert_eq!(
            clause.to_sql(),
            " WHERE (LOWER(title) LIKE ? ESCAPE '!' OR LOWER(content) LIKE ? ESCAPE '!')"
        );
        assert_eq!(clause.binds().len(), 2);
        assert_eq!(clause.binds()[0], BindValue::Text("%rust!_1%".into()));
    }

    #[test]
    fn test_json_array_contains_quotes_value() {
        let mut clause = WhereClause::new();
        clause.json_array_contains("tags", "exam");
        assert_eq!(clause.binds()[0], BindValue::Text("%\"exam\"%".into()));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_a!b"), "100!%!_a!!b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_is_unique_violation_detects_sqlite_error() {
        let pool = crate::db::create_test_pool().await.unwrap();
        pool.execute("CREATE TABLE u (slug TEXT UNIQUE)").await.unwrap();
        let sqlite = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO u (slug) VALUES ('a')").execute(sqlite).await.unwrap();
        let err = sqlx::query("INSERT INTO u (slug) VALUES ('a')")
            .execute(sqlite)
            .await
            .context("Failed to insert")
            .unwrap_err();

        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&anyhow::anyhow!("other failure")));
    }
}

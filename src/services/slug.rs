//! Slug generation and allocation
//!
//! Every entity table (authors, blogs, documents, quizzes) has a unique
//! `slug` column. Slugs are derived from a title, and collisions are resolved
//! by appending `-2`, `-3`, ... until a free one is found. The database
//! unique index is the final arbiter: when two writers race for the same
//! candidate, the loser sees a unique violation and moves to the next one.

use anyhow::Result;
use std::future::Future;

use crate::db::query::is_unique_violation;
use crate::models::limits::SLUG_MAX;

/// Fallback when a title contains nothing slug-worthy
pub const FALLBACK_SLUG: &str = "untitled";

/// Maximum number of candidates tried before giving up
const MAX_ATTEMPTS: u32 = 50;

/// Length of the base part, leaving room for a numeric suffix
const BASE_MAX: usize = 100;

/// Generate a URL-safe slug from a title.
///
/// Letters and digits are kept (including non-ASCII ones) and lowercased;
/// every other run of characters becomes a single hyphen.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() && !c.is_uppercase() {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen && !result.is_empty() {
            result.push('-');
            prev_hyphen = true;
        }
    }

    let truncated: String = result.chars().take(BASE_MAX).collect();
    let slug = truncated.trim_end_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Whether a caller-supplied slug is acceptable as-is
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.chars().count() <= SLUG_MAX
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug.chars().all(|c| c == '-' || (c.is_alphanumeric() && !c.is_uppercase()))
}

/// The `n`-th candidate for a base slug: `base`, `base-2`, `base-3`, ...
pub fn candidate(base: &str, n: u32) -> String {
    if n <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, n)
    }
}

/// Outcome of [`insert_with_unique_slug`]
#[derive(Debug)]
pub enum SlugInsert<T> {
    Inserted(T),
    /// Every candidate was taken
    Exhausted,
}

/// Insert a row under the first free slug derived from `base`.
///
/// `exists` is consulted to skip candidates that are already taken and
/// `insert` performs the write. If the write fails with a unique violation
/// (another writer took the slug in between) the next candidate is tried.
/// Other errors are returned unchanged.
pub async fn insert_with_unique_slug<T, E, EF, I, IF>(
    base: &str,
    mut exists: E,
    mut insert: I,
) -> Result<SlugInsert<T>>
where
    E: FnMut(String) -> EF,
    EF: Future<Output = Result<bool>>,
    I: FnMut(String) -> IF,
    IF: Future<Output = Result<T>>,
{
    let mut n = 1;
    while n <= MAX_ATTEMPTS {
        let slug = candidate(base, n);
        n += 1;

        if exists(slug.clone()).await? {
            continue;
        }

        match insert(slug.clone()).await {
            Ok(row) => return Ok(SlugInsert::Inserted(row)),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!("Slug {} taken concurrently, trying next", slug);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(SlugInsert::Exhausted)
}

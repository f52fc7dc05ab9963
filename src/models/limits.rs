//! Maximum field lengths (in characters) enforced before anything reaches the database

pub const TITLE_MAX: usize = 200;
pub const SLUG_MAX: usize = 200;
pub const EXCERPT_MAX: usize = 500;
pub const BLOG_CONTENT_MAX: usize = 100_000;
pub const DESCRIPTION_MAX: usize = 5_000;

pub const AUTHOR_NAME_MAX: usize = 100;
pub const AUTHOR_BIO_MAX: usize = 1_000;

pub const SUBJECT_MAX: usize = 120;
pub const UNIVERSITY_MAX: usize = 120;
pub const URL_MAX: usize = 500;
pub const TAG_MAX: usize = 40;
pub const TAGS_PER_DOCUMENT: usize = 20;
pub const YEAR_MIN: i32 = 1900;
pub const YEAR_MAX: i32 = 2100;

pub const CATEGORY_MAX: usize = 100;
pub const QUESTION_MAX: usize = 1_000;
pub const OPTION_MAX: usize = 300;
pub const OPTIONS_MIN: usize = 2;
pub const OPTIONS_MAX: usize = 8;
pub const EXPLANATION_MAX: usize = 2_000;

pub const COMMENT_NAME_MAX: usize = 50;
pub const COMMENT_CONTENT_MAX: usize = 1_000;

pub const FEEDBACK_NAME_MAX: usize = 100;
pub const FEEDBACK_DESCRIPTION_MAX: usize = 2_000;
pub const FEEDBACK_CONTACT_MAX: usize = 200;

/// Character count, not byte length
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Check a required text field: trimmed value must be non-empty and within `max`.
///
/// Returns the trimmed value or a message naming the field.
pub fn required(field: &str, value: &str, max: usize) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    if char_len(value) > max {
        return Err(format!("{} cannot exceed {} characters", field, max));
    }
    Ok(value.to_string())
}

/// Check an optional text field: trimmed value must be within `max`.
pub fn optional(field: &str, value: &str, max: usize) -> Result<String, String> {
    let value = value.trim();
    if char_len(value) > max {
        return Err(format!("{} cannot exceed {} characters", field, max));
    }
    Ok(value.to_string())
}

/// Validate a link: an absolute `http(s)://` URL or a site-relative path
pub fn url(field: &str, value: &str) -> Result<String, String> {
    let value = required(field, value, URL_MAX)?;
    let lower = value.to_lowercase();
    let absolute = ["http://", "https://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len());
    let relative = value.starts_with('/') && !value.starts_with("//");
    if !(absolute || relative) || value.chars().any(char::is_whitespace) {
        return Err(format!("{} must be an http(s) URL or a path starting with /", field));
    }
    Ok(value)
}

/// Like [`url`], but an empty value yields `None`
pub fn optional_url(field: &str, value: Option<&str>) -> Result<Option<String>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => url(field, v).map(Some),
    }
}

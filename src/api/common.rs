//! Common API utilities and shared types
//!
//! Extractors that turn rejections into the error envelope, plus query
//! parsing shared by the list endpoints.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;
use std::str::FromStr;

use crate::api::middleware::ApiError;
use crate::models::{ListParams, SortOrder};

/// Default page size for public lists
pub const DEFAULT_LIMIT: u32 = 10;

/// Default page size for admin lists
pub const ADMIN_DEFAULT_LIMIT: u32 = 20;

/// `Json` whose rejection is a `VALIDATION_ERROR` envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection is a `VALIDATION_ERROR` envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejection is a `VALIDATION_ERROR` envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

/// Plain pagination query: `?page&limit`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn params(&self, default_limit: u32) -> ListParams {
        list_params(self.page, self.limit, default_limit)
    }
}

/// Build clamped list parameters from optional query values
pub fn list_params(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> ListParams {
    ListParams::new(page.unwrap_or(1), limit.unwrap_or(default_limit))
}

/// Trimmed value, or `None` when absent or blank
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Free-text filter value, trimmed; blank means absent.
///
/// Filter values end up in list cache keys, so they are capped at `max`
/// characters.
pub fn filter_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ApiError> {
    match non_empty(value) {
        Some(v) if v.chars().count() > max => Err(ApiError::validation_error(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        v => Ok(v),
    }
}

/// `?sort=`; blank means the default order
pub fn parse_sort(value: Option<&str>) -> Result<SortOrder, ApiError> {
    match non_empty(value) {
        None => Ok(SortOrder::default()),
        Some(s) => SortOrder::parse(&s)
            .ok_or_else(|| ApiError::validation_error(format!("Invalid sort order: {}", s))),
    }
}

/// Parse an optional query value with `FromStr`; blank means absent
pub fn parse_optional<T>(field: &str, value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr,
{
    match non_empty(value) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::validation_error(format!("Invalid {}: {}", field, s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::limits::TITLE_MAX;
    use crate::models::{Difficulty, DocumentType};

    #[test]
    fn test_list_params_defaults_and_clamping() {
        assert_eq!(list_params(None, None, DEFAULT_LIMIT), ListParams::new(1, 10));
        assert_eq!(list_params(Some(0), Some(1000), DEFAULT_LIMIT), ListParams::new(1, 100));
        assert_eq!(PageQuery::default().params(ADMIN_DEFAULT_LIMIT).per_page, 20);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  maths ")), Some("maths".to_string()));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_filter_text_caps_length() {
        assert_eq!(filter_text("Search", Some("  calculus "), TITLE_MAX).unwrap(), Some("calculus".to_string()));
        assert_eq!(filter_text("Search", Some(" "), TITLE_MAX).unwrap(), None);

        let at_limit = "é".repeat(TITLE_MAX);
        assert_eq!(filter_text("Search", Some(&at_limit), TITLE_MAX).unwrap(), Some(at_limit.clone()));

        let too_long = "x".repeat(TITLE_MAX + 1);
        let err = filter_text("Search", Some(&too_long), TITLE_MAX).unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort(None).unwrap(), SortOrder::Newest);
        assert_eq!(parse_sort(Some("")).unwrap(), SortOrder::Newest);
        assert_eq!(parse_sort(Some("title")).unwrap(), SortOrder::Title);
        assert_eq!(parse_sort(Some("sideways")).unwrap_err().code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(parse_optional::<i32>("year", Some("2023")).unwrap(), Some(2023));
        assert_eq!(parse_optional::<i32>("year", Some("")).unwrap(), None);
        assert!(parse_optional::<i32>("year", Some("last")).is_err());
        assert_eq!(
            parse_optional::<DocumentType>("type", Some("question_paper")).unwrap(),
            Some(DocumentType::QuestionPaper)
        );
        assert_eq!(
            parse_optional::<Difficulty>("difficulty", Some("HARD")).unwrap(),
            Some(Difficulty::Hard)
        );
    }
}

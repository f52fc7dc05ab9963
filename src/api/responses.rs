//! Success envelopes
//!
//! Every JSON endpoint answers `{"success": true, "data": ...}`; list
//! endpoints add a `pagination` object.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::ApiError;
use crate::models::PagedResult;

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> From<&PagedResult<T>> for Pagination {
    fn from(page: &PagedResult<T>) -> Self {
        Self {
            page: page.page,
            limit: page.per_page,
            total: page.total,
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            has_prev: page.has_prev(),
        }
    }
}

/// Body of a delete response
#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub id: i64,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub type CreatedResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

/// Wrap a single value
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
        pagination: None,
    })
}

/// Wrap a page of items with its pagination metadata
pub fn paged<T: Serialize>(page: PagedResult<T>) -> Json<Envelope<Vec<T>>> {
    let pagination = Pagination::from(&page);
    Json(Envelope {
        success: true,
        data: page.items,
        pagination: Some(pagination),
    })
}

/// Wrap a newly created resource with `201 Created`
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;

    #[test]
    fn test_single_value_has_no_pagination() {
        let json = serde_json::to_value(&ok("hi").0).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "hi");
        assert!(json.get("pagination").is_none());
    }

    #[test]
    fn test_paged_envelope() {
        let page = PagedResult::new(vec![1, 2], 12, &ListParams::new(2, 5));
        let json = serde_json::to_value(&paged(page).0).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(
            json["pagination"],
            serde_json::json!({
                "page": 2,
                "limit": 5,
                "total": 12,
                "total_pages": 3,
                "has_next": true,
                "has_prev": true
            })
        );
    }
}

//! Document API endpoints
//!
//! - GET /api/v1/documents                 - Filtered, paginated list
//! - GET /api/v1/documents/filters         - Values for the search filters
//! - GET /api/v1/documents/{slug}          - Document detail (counts a view)
//! - GET /api/v1/documents/{slug}/related  - Same-subject documents
//! - /api/v1/documents/{slug}/comments     - see `comments`
//! - /api/v1/admin/documents               - Create, read, update, delete by id

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::api::comments;
use crate::api::common::{
    filter_text, list_params, parse_optional, parse_sort, ApiJson, ApiPath, ApiQuery, DEFAULT_LIMIT,
};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{created, ok, paged, ApiResult, CreatedResult, Deleted};
use crate::models::limits::{SUBJECT_MAX, TAG_MAX, TITLE_MAX, UNIVERSITY_MAX};
use crate::models::{
    CreateDocumentInput, Document, DocumentFilter, DocumentFilterOptions, UpdateDocumentInput,
};

/// Related documents returned when the caller does not say
const DEFAULT_RELATED: i64 = 5;

/// `?page&limit&search&type&subject&university&year&tag&sort`
#[derive(Debug, Default, Deserialize)]
pub struct DocumentListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub subject: Option<String>,
    pub university: Option<String>,
    pub year: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
}

impl DocumentListQuery {
    /// Tags are stored lowercased, so the tag filter is too
    pub fn filter(&self) -> Result<DocumentFilter, ApiError> {
        Ok(DocumentFilter {
            search: filter_text("Search", self.search.as_deref(), TITLE_MAX)?,
            doc_type: parse_optional("type", self.doc_type.as_deref())?,
            subject: filter_text("Subject", self.subject.as_deref(), SUBJECT_MAX)?,
            university: filter_text("University", self.university.as_deref(), UNIVERSITY_MAX)?,
            year: parse_optional("year", self.year.as_deref())?,
            tag: filter_text("Tag", self.tag.as_deref(), TAG_MAX)?.map(|t| t.to_lowercase()),
            sort: parse_sort(self.sort.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<i64>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_documents))
        .route("/filters", get(get_filters))
        .route("/{slug}", get(get_document))
        .route("/{slug}/related", get(get_related))
        .route(
            "/{slug}/comments",
            get(comments::list_document_comments).post(comments::create_comment),
        )
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_document))
        .route(
            "/{id}",
            get(get_document_by_id).put(update_document).delete(delete_document),
        )
}

async fn list_documents(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DocumentListQuery>,
) -> ApiResult<Vec<Document>> {
    let filter = query.filter()?;
    let params = list_params(query.page, query.limit, DEFAULT_LIMIT);
    Ok(paged(state.document_service.list(&filter, &params).await?))
}

async fn get_filters(State(state): State<AppState>) -> ApiResult<DocumentFilterOptions> {
    Ok(ok(state.document_service.filter_options().await?))
}

async fn get_document(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Document> {
    Ok(ok(state.document_service.view(&slug).await?))
}

async fn get_related(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiQuery(query): ApiQuery<RelatedQuery>,
) -> ApiResult<Vec<Document>> {
    let limit = query.limit.unwrap_or(DEFAULT_RELATED);
    Ok(ok(state.document_service.related(&slug, limit).await?))
}

async fn create_document(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateDocumentInput>,
) -> CreatedResult<Document> {
    Ok(created(state.document_service.create(input).await?))
}

async fn get_document_by_id(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Document> {
    Ok(ok(state.document_service.get_by_id(id).await?))
}

async fn update_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateDocumentInput>,
) -> ApiResult<Document> {
    Ok(ok(state.document_service.update(id, input).await?))
}

/// Comments on the document are removed with it
async fn delete_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Deleted> {
    state.document_service.delete(id).await?;
    Ok(ok(Deleted { id }))
}

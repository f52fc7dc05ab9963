//! Comment API endpoints
//!
//! Public:
//! - GET  /api/v1/documents/{slug}/comments - Comments on a document, newest first
//! - POST /api/v1/documents/{slug}/comments - Post a comment
//!
//! Admin:
//! - GET    /api/v1/admin/comments      - Recent comments across documents
//! - DELETE /api/v1/admin/comments/{id} - Delete a comment

use axum::{
    extract::State,
    routing::{delete, get},
    Router,
};

use crate::api::common::{ApiJson, ApiPath, ApiQuery, PageQuery, ADMIN_DEFAULT_LIMIT, DEFAULT_LIMIT};
use crate::api::middleware::AppState;
use crate::api::responses::{created, ok, paged, ApiResult, CreatedResult, Deleted};
use crate::models::{Comment, CommentWithDocument, CreateCommentInput};

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recent_comments))
        .route("/{id}", delete(delete_comment))
}

pub(crate) async fn list_document_comments(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Comment>> {
    let page = state
        .comment_service
        .list_for_document(&slug, &query.params(DEFAULT_LIMIT))
        .await?;
    Ok(paged(page))
}

pub(crate) async fn create_comment(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiJson(input): ApiJson<CreateCommentInput>,
) -> CreatedResult<Comment> {
    Ok(created(state.comment_service.create(&slug, input).await?))
}

async fn list_recent_comments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<CommentWithDocument>> {
    let page = state
        .comment_service
        .list_recent(&query.params(ADMIN_DEFAULT_LIMIT))
        .await?;
    Ok(paged(page))
}

async fn delete_comment(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Deleted> {
    state.comment_service.delete(id).await?;
    Ok(ok(Deleted { id }))
}

//! Author API endpoints
//!
//! - GET    /api/v1/authors               - List authors
//! - GET    /api/v1/authors/{slug}        - Author profile with published posts
//! - POST   /api/v1/admin/authors         - Create author
//! - PUT    /api/v1/admin/authors/{id}    - Update author
//! - DELETE /api/v1/admin/authors/{id}    - Delete author (posts are kept)

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::{ApiJson, ApiPath, ApiQuery, PageQuery, DEFAULT_LIMIT};
use crate::api::middleware::AppState;
use crate::api::responses::{created, ok, paged, ApiResult, CreatedResult, Deleted, Envelope, Pagination};
use crate::models::{Author, Blog, BlogFilter, CreateAuthorInput, UpdateAuthorInput};

/// Author with a page of their published posts
#[derive(Debug, Serialize)]
pub struct AuthorProfile {
    pub author: Author,
    pub blogs: Vec<Blog>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_authors))
        .route("/{slug}", get(get_author))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_author))
        .route("/{id}", put(update_author).delete(delete_author))
}

async fn list_authors(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Author>> {
    let page = state.author_service.list(&query.params(DEFAULT_LIMIT)).await?;
    Ok(paged(page))
}

/// The pagination object describes the author's posts
async fn get_author(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<AuthorProfile> {
    let author = state.author_service.get_by_slug(&slug).await?;
    let filter = BlogFilter {
        author_id: Some(author.id),
        ..BlogFilter::published()
    };
    let blogs = state
        .blog_service
        .list_published(&filter, &query.params(DEFAULT_LIMIT))
        .await?;

    let pagination = Pagination::from(&blogs);
    Ok(Json(Envelope {
        success: true,
        data: AuthorProfile {
            author,
            blogs: blogs.items,
        },
        pagination: Some(pagination),
    }))
}

async fn create_author(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateAuthorInput>,
) -> CreatedResult<Author> {
    let author = state.author_service.create(input).await?;
    Ok(created(author))
}

async fn update_author(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateAuthorInput>,
) -> ApiResult<Author> {
    Ok(ok(state.author_service.update(id, input).await?))
}

async fn delete_author(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Deleted> {
    state.author_service.delete(id).await?;
    Ok(ok(Deleted { id }))
}

//! Blog API endpoints
//!
//! Public reads only see published posts. Admin routes address posts by id
//! and include drafts.

use axum::{
    extract::State,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::common::{
    filter_text, list_params, non_empty, parse_sort, ApiJson, ApiPath, ApiQuery,
    ADMIN_DEFAULT_LIMIT, DEFAULT_LIMIT,
};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{created, ok, paged, ApiResult, CreatedResult, Deleted};
use crate::models::limits::TITLE_MAX;
use crate::models::{Blog, BlogFilter, CreateBlogInput, UpdateBlogInput};

/// `?page&limit&search&author&sort`
#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    /// Author slug
    pub author: Option<String>,
    pub sort: Option<String>,
}

impl BlogListQuery {
    async fn filter(&self, state: &AppState) -> Result<BlogFilter, ApiError> {
        let author_id = match non_empty(self.author.as_deref()) {
            Some(slug) => Some(state.author_service.get_by_slug(&slug).await?.id),
            None => None,
        };
        Ok(BlogFilter {
            search: filter_text("Search", self.search.as_deref(), TITLE_MAX)?,
            author_id,
            published_only: false,
            sort: parse_sort(self.sort.as_deref())?,
        })
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blogs))
        .route("/{slug}", get(get_blog))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_blogs).post(create_blog))
        .route("/{id}", get(get_blog_by_id).put(update_blog).delete(delete_blog))
}

/// GET /api/v1/blogs - Published posts
async fn list_blogs(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BlogListQuery>,
) -> ApiResult<Vec<Blog>> {
    let filter = query.filter(&state).await?;
    let params = list_params(query.page, query.limit, DEFAULT_LIMIT);
    Ok(paged(state.blog_service.list_published(&filter, &params).await?))
}

/// GET /api/v1/blogs/{slug} - Drafts are reported as not found
async fn get_blog(State(state): State<AppState>, ApiPath(slug): ApiPath<String>) -> ApiResult<Blog> {
    Ok(ok(state.blog_service.get_published_by_slug(&slug).await?))
}

/// GET /api/v1/admin/blogs - Every post, drafts included
async fn admin_list_blogs(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BlogListQuery>,
) -> ApiResult<Vec<Blog>> {
    let filter = query.filter(&state).await?;
    let params = list_params(query.page, query.limit, ADMIN_DEFAULT_LIMIT);
    Ok(paged(state.blog_service.list(&filter, &params).await?))
}

async fn create_blog(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateBlogInput>,
) -> CreatedResult<Blog> {
    Ok(created(state.blog_service.create(input).await?))
}

async fn get_blog_by_id(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Blog> {
    Ok(ok(state.blog_service.get_by_id(id).await?))
}

async fn update_blog(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateBlogInput>,
) -> ApiResult<Blog> {
    Ok(ok(state.blog_service.update(id, input).await?))
}

async fn delete_blog(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Deleted> {
    state.blog_service.delete(id).await?;
    Ok(ok(Deleted { id }))
}

//! Feedback API endpoints
//!
//! - POST   /api/v1/feedback                   - Submit feedback
//! - GET    /api/v1/admin/feedback?status      - Review queue
//! - PUT    /api/v1/admin/feedback/{id}/status - Move to another status
//! - DELETE /api/v1/admin/feedback/{id}

use axum::{
    extract::State,
    routing::{delete, get, put},
    Router,
};
use serde::Deserialize;

use crate::api::common::{list_params, parse_optional, ApiJson, ApiPath, ApiQuery, ADMIN_DEFAULT_LIMIT};
use crate::api::middleware::AppState;
use crate::api::responses::{created, ok, paged, ApiResult, CreatedResult, Deleted};
use crate::models::{CreateFeedbackInput, Feedback, FeedbackStatus};

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: FeedbackStatus,
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_feedback))
        .route("/{id}/status", put(update_status))
        .route("/{id}", delete(delete_feedback))
}

pub(crate) async fn create_feedback(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateFeedbackInput>,
) -> CreatedResult<Feedback> {
    Ok(created(state.feedback_service.create(input).await?))
}

async fn list_feedback(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FeedbackListQuery>,
) -> ApiResult<Vec<Feedback>> {
    let status = parse_optional::<FeedbackStatus>("status", query.status.as_deref())?;
    let params = list_params(query.page, query.limit, ADMIN_DEFAULT_LIMIT);
    Ok(paged(state.feedback_service.list(status, &params).await?))
}

async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Feedback> {
    Ok(ok(state.feedback_service.update_status(id, body.status).await?))
}

async fn delete_feedback(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Deleted> {
    state.feedback_service.delete(id).await?;
    Ok(ok(Deleted { id }))
}

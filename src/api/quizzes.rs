//! Quiz API endpoints
//!
//! Public:
//! - GET  /api/v1/quizzes                          - List quizzes
//! - GET  /api/v1/quizzes/categories               - Categories with quiz counts
//! - GET  /api/v1/quizzes/{slug}                   - Quiz without answers
//! - POST /api/v1/quizzes/sessions                 - Start a timed session
//! - POST /api/v1/quizzes/sessions/{id}/submit     - Submit answers and get the score
//!
//! Admin (full quizzes, answers included):
//! - POST /api/v1/admin/quizzes, GET/PUT/DELETE /api/v1/admin/quizzes/{id}

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::common::{filter_text, list_params, parse_sort, ApiJson, ApiPath, ApiQuery, DEFAULT_LIMIT};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{created, ok, paged, ApiResult, CreatedResult, Deleted};
use crate::models::limits::{CATEGORY_MAX, TITLE_MAX};
use crate::models::{
    CategoryCount, CreateQuizInput, PublicQuiz, Quiz, QuizFilter, QuizResult, QuizSummary,
    SessionStarted, StartSessionInput, SubmitAnswersInput, UpdateQuizInput,
};

/// `?page&limit&search&category&sort`
#[derive(Debug, Default, Deserialize)]
pub struct QuizListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl QuizListQuery {
    pub fn filter(&self) -> Result<QuizFilter, ApiError> {
        Ok(QuizFilter {
            search: filter_text("Search", self.search.as_deref(), TITLE_MAX)?,
            category: filter_text("Category", self.category.as_deref(), CATEGORY_MAX)?,
            sort: parse_sort(self.sort.as_deref())?,
        })
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_quizzes))
        .route("/categories", get(list_categories))
        .route("/sessions", post(start_session))
        .route("/sessions/{id}/submit", post(submit_session))
        .route("/{slug}", get(get_quiz))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_quiz))
        .route("/{id}", get(get_quiz_by_id).put(update_quiz).delete(delete_quiz))
}

async fn list_quizzes(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QuizListQuery>,
) -> ApiResult<Vec<QuizSummary>> {
    let filter = query.filter()?;
    let params = list_params(query.page, query.limit, DEFAULT_LIMIT);
    Ok(paged(state.quiz_service.list(&filter, &params).await?))
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryCount>> {
    Ok(ok(state.quiz_service.categories().await?))
}

/// Answers and explanations are stripped
async fn get_quiz(State(state): State<AppState>, ApiPath(slug): ApiPath<String>) -> ApiResult<PublicQuiz> {
    let quiz = state.quiz_service.get_by_slug(&slug).await?;
    Ok(ok(PublicQuiz::from(&quiz)))
}

async fn start_session(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<StartSessionInput>,
) -> CreatedResult<SessionStarted> {
    Ok(created(state.quiz_service.start_session(input).await?))
}

/// A malformed id cannot name a live session, so it is reported as not found
async fn submit_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<SubmitAnswersInput>,
) -> ApiResult<QuizResult> {
    let session_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::not_found(format!("Quiz session not found: {}", id)))?;
    Ok(ok(state.quiz_service.submit_session(session_id, input).await?))
}

async fn create_quiz(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateQuizInput>,
) -> CreatedResult<Quiz> {
    Ok(created(state.quiz_service.create(input).await?))
}

async fn get_quiz_by_id(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Quiz> {
    Ok(ok(state.quiz_service.get_by_id(id).await?))
}

async fn update_quiz(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateQuizInput>,
) -> ApiResult<Quiz> {
    Ok(ok(state.quiz_service.update(id, input).await?))
}

async fn delete_quiz(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Deleted> {
    state.quiz_service.delete(id).await?;
    Ok(ok(Deleted { id }))
}

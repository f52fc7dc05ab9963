//! API middleware and shared handler types
//!
//! Contains:
//! - `AppState`, the services every handler reaches through `State`
//! - `ApiError`, the `{success: false, error, code}` response
//! - the admin bearer-token guard
//! - security headers added to every response

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{create_cache, Cache};
use crate::config::Config;
use crate::db::repositories::{
    SqlxAuthorRepository, SqlxBlogRepository, SqlxCommentRepository, SqlxDocumentRepository,
    SqlxFeedbackRepository, SqlxQuizRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    AuthorService, AuthorServiceError, BlogService, BlogServiceError, CommentService,
    CommentServiceError, DashboardService, DocumentService, DocumentServiceError,
    FeedbackService, FeedbackServiceError, MarkdownRenderer, QuizService, QuizServiceError,
    SeedService,
};
use crate::views::ViewEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub cache: Arc<Cache>,
    pub config: Arc<Config>,
    pub views: Arc<ViewEngine>,
    pub author_service: Arc<AuthorService>,
    pub blog_service: Arc<BlogService>,
    pub document_service: Arc<DocumentService>,
    pub quiz_service: Arc<QuizService>,
    pub comment_service: Arc<CommentService>,
    pub feedback_service: Arc<FeedbackService>,
    pub dashboard_service: Arc<DashboardService>,
    pub seed_service: Arc<SeedService>,
}

impl AppState {
    /// Wire repositories and services over one pool and cache
    pub fn new(pool: DynDatabasePool, config: Config) -> anyhow::Result<Self> {
        let cache = create_cache(&config.cache);
        let views = ViewEngine::new().context("Failed to load page templates")?;

        let author_repo = SqlxAuthorRepository::boxed(pool.clone());
        let document_repo = SqlxDocumentRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());

        let author_service = Arc::new(AuthorService::new(author_repo.clone(), cache.clone()));
        let blog_service = Arc::new(BlogService::new(
            SqlxBlogRepository::boxed(pool.clone()),
            author_repo,
            cache.clone(),
            MarkdownRenderer::new(),
        ));
        let document_service = Arc::new(DocumentService::new(
            document_repo.clone(),
            comment_repo.clone(),
            cache.clone(),
        ));
        let quiz_service = Arc::new(QuizService::new(
            SqlxQuizRepository::boxed(pool.clone()),
            cache.clone(),
            config.quiz.clone(),
        ));
        let comment_service = Arc::new(CommentService::new(comment_repo, document_repo));
        let feedback_service = Arc::new(FeedbackService::new(SqlxFeedbackRepository::boxed(pool.clone())));
        let dashboard_service = Arc::new(DashboardService::new(
            blog_service.clone(),
            document_service.clone(),
            quiz_service.clone(),
            comment_service.clone(),
            feedback_service.clone(),
        ));
        let seed_service = Arc::new(SeedService::new(
            author_service.clone(),
            blog_service.clone(),
            document_service.clone(),
            quiz_service.clone(),
            comment_service.clone(),
        ));

        Ok(Self {
            pool,
            cache,
            config: Arc::new(config),
            views: Arc::new(views),
            author_service,
            blog_service,
            document_service,
            quiz_service,
            comment_service,
            feedback_service,
            dashboard_service,
            seed_service,
        })
    }
}

/// Error response for API errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Wire shape of an error
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            success: false,
            error: self.message,
            code: self.code,
        };
        (status, Json(body)).into_response()
    }
}

/// Log the full error chain and hide it from the caller
fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Internal error: {:#}", e);
    ApiError::internal_error("Internal server error")
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        internal(e)
    }
}

impl From<AuthorServiceError> for ApiError {
    fn from(e: AuthorServiceError) -> Self {
        match e {
            AuthorServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            AuthorServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            AuthorServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            AuthorServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<BlogServiceError> for ApiError {
    fn from(e: BlogServiceError) -> Self {
        match e {
            BlogServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            BlogServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            BlogServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            BlogServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<DocumentServiceError> for ApiError {
    fn from(e: DocumentServiceError) -> Self {
        match e {
            DocumentServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            DocumentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            DocumentServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            DocumentServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<QuizServiceError> for ApiError {
    fn from(e: QuizServiceError) -> Self {
        match e {
            QuizServiceError::NotFound(_) | QuizServiceError::SessionNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            QuizServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            QuizServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            QuizServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<FeedbackServiceError> for ApiError {
    fn from(e: FeedbackServiceError) -> Self {
        match e {
            FeedbackServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            FeedbackServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            FeedbackServiceError::InternalError(e) => internal(e),
        }
    }
}

/// Extract a bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Compare without returning early on the first differing byte
fn tokens_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Admin authorization middleware
///
/// Every admin route is rejected when `admin.token` is not configured.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state
        .config
        .admin
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::forbidden("Admin API is disabled"))?;

    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing admin token"))?;
    if !tokens_match(token, expected) {
        tracing::warn!("Rejected admin request to {}", request.uri().path());
        return Err(ApiError::unauthorized("Invalid admin token"));
    }

    Ok(next.run(request).await)
}

/// Headers set on every response unless a handler already set them
const SECURITY_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
];

/// Middleware adding the security headers
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&request_with_auth("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_bearer_token(&request_with_auth("Basic abc123")), None);
        assert_eq!(extract_bearer_token(&request_with_auth("Bearer ")), None);

        let bare = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert_eq!(extract_bearer_token(&bare), None);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("secret", "secret"));
        assert!(!tokens_match("secret", "secreT"));
        assert!(!tokens_match("secret", "secrets"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::internal_error("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::new("SOMETHING_ELSE", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_service_errors_map_to_codes() {
        let e: ApiError = QuizServiceError::SessionNotFound("abc".into()).into();
        assert_eq!(e.code, "NOT_FOUND");

        let e: ApiError = BlogServiceError::DuplicateSlug("hello".into()).into();
        assert_eq!(e.code, "CONFLICT");

        let e: ApiError = DocumentServiceError::ValidationError("Title is required".into()).into();
        assert_eq!(e.code, "VALIDATION_ERROR");
        assert_eq!(e.message, "Title is required");
    }

    #[test]
    fn test_internal_errors_are_hidden() {
        let e: ApiError = FeedbackServiceError::InternalError(anyhow::anyhow!("connection reset")).into();
        assert_eq!(e.code, "INTERNAL_ERROR");
        assert!(!e.message.contains("connection reset"));
    }
}

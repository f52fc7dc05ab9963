//! API layer - HTTP handlers and routing
//!
//! - JSON endpoints under `/api/v1` (public reads, comment and feedback
//!   forms, quiz sessions, token-guarded admin routes)
//! - `/sitemap.xml` and `/robots.txt`
//! - server-rendered pages

pub mod admin;
pub mod authors;
pub mod blogs;
pub mod comments;
pub mod common;
pub mod documents;
pub mod feedback;
pub mod middleware;
pub mod pages;
pub mod quizzes;
pub mod responses;
pub mod site;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let admin_routes = admin::router().route_layer(axum_middleware::from_fn_with_state(
        state,
        middleware::require_admin,
    ));

    Router::new()
        .nest("/blogs", blogs::public_router())
        .nest("/authors", authors::public_router())
        .nest("/documents", documents::public_router())
        .nest("/quizzes", quizzes::public_router())
        .route("/feedback", post(feedback::create_feedback))
        .route("/health", get(site::health))
        .nest("/admin", admin_routes)
        .fallback(api_not_found)
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("No such API endpoint")
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin.trim() == "*" {
        return cors.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            tracing::warn!("Invalid CORS origin '{}', cross-origin requests are disabled", origin);
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .route("/sitemap.xml", get(site::sitemap))
        .route("/robots.txt", get(site::robots))
        .merge(pages::router())
        .fallback(pages::not_found)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(axum_middleware::from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

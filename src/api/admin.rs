//! Admin API
//!
//! Everything under `/api/v1/admin` sits behind `require_admin`:
//! - entity management routers from each entity module
//! - GET  /dashboard   - Site totals and latest activity
//! - POST /seed        - Insert sample content into an empty site
//! - POST /cache/clear - Drop cached content reads

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::responses::{ok, ApiResult};
use crate::api::{authors, blogs, comments, documents, feedback, middleware::AppState, quizzes};
use crate::services::{invalidate, DashboardStats, SeedReport, CONTENT_CACHE_PATTERNS};

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheCleared {
    pub patterns: Vec<String>,
}

/// Admin routes, without the auth layer (added by the caller)
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/authors", authors::admin_router())
        .nest("/blogs", blogs::admin_router())
        .nest("/documents", documents::admin_router())
        .nest("/quizzes", quizzes::admin_router())
        .nest("/comments", comments::admin_router())
        .nest("/feedback", feedback::admin_router())
        .route("/dashboard", get(get_dashboard))
        .route("/seed", post(seed))
        .route("/cache/clear", post(clear_cache))
}

async fn get_dashboard(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    Ok(ok(state.dashboard_service.stats().await?))
}

/// `skipped` is true when the site already has content
async fn seed(State(state): State<AppState>) -> ApiResult<SeedReport> {
    Ok(ok(state.seed_service.run().await?))
}

/// Running quiz sessions live in the same cache and are kept
async fn clear_cache(State(state): State<AppState>) -> ApiResult<CacheCleared> {
    invalidate(&state.cache, &CONTENT_CACHE_PATTERNS).await;
    tracing::info!("Content cache cleared");
    Ok(ok(CacheCleared {
        patterns: CONTENT_CACHE_PATTERNS.iter().map(|p| p.to_string()).collect(),
    }))
}

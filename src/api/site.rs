//! Site-level endpoints
//!
//! - GET /api/v1/health - Liveness plus a database ping
//! - GET /sitemap.xml   - Public pages, published posts and documents
//! - GET /robots.txt

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ok, ApiResult};
use crate::models::{BlogFilter, DocumentFilter, ListParams};
use crate::services::markdown::html_escape;

/// Pages listed in the sitemap regardless of content
const STATIC_PATHS: [&str; 4] = ["/", "/blog", "/documents", "/quizzes"];

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// One `<url>` in the sitemap
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub path: String,
    pub last_modified: Option<DateTime<Utc>>,
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Health> {
    state.pool.ping().await?;
    Ok(ok(Health {
        status: "ok".to_string(),
        database: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

pub async fn sitemap(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut entries: Vec<SitemapEntry> = STATIC_PATHS
        .iter()
        .map(|path| SitemapEntry {
            path: path.to_string(),
            last_modified: None,
        })
        .collect();

    let published = BlogFilter::published();
    let mut page = 1;
    loop {
        let params = ListParams::new(page, ListParams::MAX_PER_PAGE);
        let blogs = state.blog_service.list(&published, &params).await?;
        entries.extend(blogs.items.iter().map(|b| SitemapEntry {
            path: format!("/blog/{}", b.slug),
            last_modified: Some(b.updated_at),
        }));
        if !blogs.has_next() {
            break;
        }
        page += 1;
    }

    let all = DocumentFilter::default();
    let mut page = 1;
    loop {
        let params = ListParams::new(page, ListParams::MAX_PER_PAGE);
        let documents = state.document_service.list(&all, &params).await?;
        entries.extend(documents.items.iter().map(|d| SitemapEntry {
            path: format!("/documents/{}", d.slug),
            last_modified: Some(d.updated_at),
        }));
        if !documents.has_next() {
            break;
        }
        page += 1;
    }

    let xml = sitemap_xml(&state.config.server.base_url, &entries);
    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml).into_response())
}

pub async fn robots(State(state): State<AppState>) -> Response {
    let mut context = tera::Context::new();
    context.insert("base_url", state.config.server.base_url.trim_end_matches('/'));
    let body = match state.views.render("robots.txt", &context) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Failed to render robots.txt: {}", e);
            "User-agent: *\nAllow: /\n".to_string()
        }
    };
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// Render sitemap entries as a sitemaps.org urlset
pub fn sitemap_xml(base_url: &str, entries: &[SitemapEntry]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", html_escape(&format!("{}{}", base, entry.path))));
        if let Some(modified) = entry.last_modified {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", modified.format("%Y-%m-%d")));
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sitemap_xml() {
        let entries = vec![
            SitemapEntry {
                path: "/".into(),
                last_modified: None,
            },
            SitemapEntry {
                path: "/documents/q&a-notes".into(),
                last_modified: Some(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()),
            },
        ];
        let xml = sitemap_xml("https://study.example.org/", &entries);

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://study.example.org/</loc>"));
        assert!(xml.contains("<loc>https://study.example.org/documents/q&amp;a-notes</loc>"));
        assert!(xml.contains("<lastmod>2024-03-09</lastmod>"));
        assert_eq!(xml.matches("<url>").count(), 2);
    }
}

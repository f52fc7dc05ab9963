//! View engine
//!
//! Server-rendered pages use Tera with the templates under `templates/`
//! compiled into the binary. Rendering never fails from the caller's point
//! of view: a broken template falls back to `error.html`, then to a plain
//! HTML page.

use chrono::Datelike;
use std::error::Error as StdError;
use tera::{Context, Tera};

use crate::services::markdown::html_escape;

/// Templates compiled into the binary, keyed by the name pages render them by
const TEMPLATES: [(&str, &str); 10] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("pager.html", include_str!("../../templates/pager.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("blog_list.html", include_str!("../../templates/blog_list.html")),
    ("blog_detail.html", include_str!("../../templates/blog_detail.html")),
    ("document_list.html", include_str!("../../templates/document_list.html")),
    ("document_detail.html", include_str!("../../templates/document_detail.html")),
    ("quiz_list.html", include_str!("../../templates/quiz_list.html")),
    ("error.html", include_str!("../../templates/error.html")),
    ("robots.txt", include_str!("../../templates/robots.txt")),
];

/// Site name shown in page titles and the header
pub const SITE_NAME: &str = "StudyVault";

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Template error: {0}")]
    TemplateError(String),
}

impl From<tera::Error> for ViewError {
    fn from(e: tera::Error) -> Self {
        let mut message = e.to_string();
        let mut source = e.source();
        while let Some(s) = source {
            message.push_str(&format!("\n  Caused by: {}", s));
            source = s.source();
        }
        ViewError::TemplateError(message)
    }
}

/// Tera wrapper for the public pages
pub struct ViewEngine {
    tera: Tera,
}

impl ViewEngine {
    /// Build the engine from the embedded templates.
    ///
    /// Fails when a template does not parse or an `extends` target is missing.
    pub fn new() -> Result<Self, ViewError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    /// Context with the variables every page layout uses
    pub fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site_name", SITE_NAME);
        context.insert("year", &chrono::Utc::now().year());
        context
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<String, ViewError> {
        Ok(self.tera.render(template, context)?)
    }

    /// Render a page, falling back to the error template and then to plain HTML
    pub fn render_with_fallback(&self, template: &str, context: &Context) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {}, trying error template", template, e);
                self.render_error(500, "Something went wrong while rendering this page.")
            }
        }
    }

    /// Render the error page for a status code
    pub fn render_error(&self, status: u16, message: &str) -> String {
        let mut context = self.base_context();
        context.insert("status", &status);
        context.insert("error_message", message);
        match self.render("error.html", &context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render error template: {}, returning plain page", e);
                simple_error_page(status, message)
            }
        }
    }
}

/// Last-resort page used when no template renders
fn simple_error_page(status: u16, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{status} - {site}</title>
</head>
<body>
    <h1>{status}</h1>
    <p>{message}</p>
    <p><a href="/">Back to the home page</a></p>
</body>
</html>"#,
        status = status,
        site = SITE_NAME,
        message = html_escape(message),
    )
}

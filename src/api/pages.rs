//! Server-rendered pages
//!
//! - GET /                   - Home: latest documents, posts and quiz categories
//! - GET /blog, /blog/{slug}
//! - GET /documents, /documents/{slug} (inline PDF preview)
//! - GET /quizzes
//!
//! Failures render the error page with the matching status instead of JSON.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tera::Context;

use crate::api::blogs::BlogListQuery;
use crate::api::common::{filter_text, list_params, DEFAULT_LIMIT};
use crate::api::documents::DocumentListQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::quizzes::QuizListQuery;
use crate::models::limits::TITLE_MAX;
use crate::models::{BlogFilter, Document, DocumentFilter, DocumentType, ListParams, PagedResult, QuizFilter};

/// Items per section on the home page
const HOME_ITEMS: u32 = 6;

/// Comments shown under a document
const DETAIL_COMMENTS: u32 = 20;

/// Related documents shown under a document
const DETAIL_RELATED: i64 = 5;

/// Document plus the fields templates need that are derived, not stored
#[derive(Debug, Serialize)]
struct DocumentView {
    #[serde(flatten)]
    document: Document,
    doc_type_label: &'static str,
    is_pdf: bool,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        Self {
            doc_type_label: document.doc_type.label(),
            is_pdf: document.is_pdf(),
            document,
        }
    }
}

#[derive(Debug, Serialize)]
struct TypeOption {
    value: &'static str,
    label: &'static str,
}

/// Query-string pair carried over to pager links
#[derive(Debug, Serialize)]
struct QueryPair {
    key: &'static str,
    value: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/blog", get(blog_list))
        .route("/blog/{slug}", get(blog_detail))
        .route("/documents", get(document_list))
        .route("/documents/{slug}", get(document_detail))
        .route("/quizzes", get(quiz_list))
}

/// Fallback for unknown paths outside the API
pub async fn not_found(State(state): State<AppState>) -> Response {
    let html = state.views.render_error(404, "The page you are looking for does not exist.");
    (StatusCode::NOT_FOUND, Html(html)).into_response()
}

/// Render `template` with the context, or the error page for the failure
fn respond(state: &AppState, template: &str, context: Result<Context, ApiError>) -> Response {
    match context {
        Ok(context) => Html(state.views.render_with_fallback(template, &context)).into_response(),
        Err(e) => {
            let status = e.status();
            let message = if status.is_server_error() {
                "Something went wrong. Please try again later.".to_string()
            } else {
                e.message
            };
            (status, Html(state.views.render_error(status.as_u16(), &message))).into_response()
        }
    }
}

/// Insert a page and its pager variables
fn insert_page<T: Serialize>(context: &mut Context, page: &PagedResult<T>, query: Vec<QueryPair>) {
    context.insert("page", page);
    context.insert("total_pages", &page.total_pages());
    context.insert("has_next", &page.has_next());
    context.insert("has_prev", &page.has_prev());
    context.insert("query", &query);
}

/// Carry non-empty filters over to pager links
fn query_pairs(pairs: &[(&'static str, Option<&str>)]) -> Vec<QueryPair> {
    pairs
        .iter()
        .filter_map(|&(key, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| QueryPair {
                    key,
                    value: v.to_string(),
                })
        })
        .collect()
}

async fn home(State(state): State<AppState>) -> Response {
    let context = async {
        let recent = ListParams::new(1, HOME_ITEMS);
        let (documents, blogs, categories) = tokio::try_join!(
            async { Ok::<_, ApiError>(state.document_service.list(&DocumentFilter::default(), &recent).await?) },
            async { Ok::<_, ApiError>(state.blog_service.list_published(&BlogFilter::published(), &recent).await?) },
            async { Ok::<_, ApiError>(state.quiz_service.categories().await?) },
        )?;

        let documents: Vec<DocumentView> = documents.items.into_iter().map(DocumentView::from).collect();
        let mut context = state.views.base_context();
        context.insert("documents", &documents);
        context.insert("blogs", &blogs.items);
        context.insert("categories", &categories);
        Ok::<_, ApiError>(context)
    }
    .await;
    respond(&state, "index.html", context)
}

async fn blog_list(
    State(state): State<AppState>,
    query: Result<Query<BlogListQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let context = async {
        let filter = BlogFilter {
            search: filter_text("Search", query.search.as_deref(), TITLE_MAX)?,
            ..BlogFilter::published()
        };
        let params = list_params(query.page, query.limit, DEFAULT_LIMIT);
        let page = state.blog_service.list_published(&filter, &params).await?;

        let mut context = state.views.base_context();
        context.insert("search", query.search.as_deref().unwrap_or(""));
        insert_page(&mut context, &page, query_pairs(&[("search", query.search.as_deref())]));
        Ok::<_, ApiError>(context)
    }
    .await;
    respond(&state, "blog_list.html", context)
}

async fn blog_detail(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let context = async {
        let blog = state.blog_service.get_published_by_slug(&slug).await?;
        let author = match blog.author_id {
            Some(id) => state.author_service.get_by_id(id).await.ok(),
            None => None,
        };

        let mut context = state.views.base_context();
        context.insert("blog", &blog);
        context.insert("author", &author);
        Ok::<_, ApiError>(context)
    }
    .await;
    respond(&state, "blog_detail.html", context)
}

async fn document_list(
    State(state): State<AppState>,
    query: Result<Query<DocumentListQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let context = async {
        let filter = query.filter()?;
        let params = list_params(query.page, query.limit, DEFAULT_LIMIT);
        let (page, options) = tokio::try_join!(
            async { Ok::<_, ApiError>(state.document_service.list(&filter, &params).await?) },
            async { Ok::<_, ApiError>(state.document_service.filter_options().await?) },
        )?;

        let types: Vec<TypeOption> = options
            .types
            .iter()
            .map(|t| TypeOption {
                value: t.as_str(),
                label: t.label(),
            })
            .collect();
        let pairs = query_pairs(&[
            ("search", query.search.as_deref()),
            ("type", query.doc_type.as_deref()),
            ("subject", query.subject.as_deref()),
            ("university", query.university.as_deref()),
            ("year", query.year.as_deref()),
            ("tag", query.tag.as_deref()),
        ]);
        let page = page.map(DocumentView::from);

        let mut context = state.views.base_context();
        context.insert("search", query.search.as_deref().unwrap_or(""));
        context.insert("selected_type", filter.doc_type.map(|t: DocumentType| t.as_str()).unwrap_or(""));
        context.insert("selected_subject", filter.subject.as_deref().unwrap_or(""));
        context.insert("selected_university", filter.university.as_deref().unwrap_or(""));
        context.insert(
            "filters",
            &serde_json::json!({
                "subjects": options.subjects,
                "universities": options.universities,
                "types": types,
            }),
        );
        insert_page(&mut context, &page, pairs);
        Ok::<_, ApiError>(context)
    }
    .await;
    respond(&state, "document_list.html", context)
}

async fn document_detail(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let context = async {
        let document = state.document_service.view(&slug).await?;
        let (comments, related) = tokio::try_join!(
            async {
                Ok::<_, ApiError>(
                    state
                        .comment_service
                        .list_for_document(&slug, &ListParams::new(1, DETAIL_COMMENTS))
                        .await?,
                )
            },
            async { Ok::<_, ApiError>(state.document_service.related(&slug, DETAIL_RELATED).await?) },
        )?;

        let mut context = state.views.base_context();
        context.insert("document", &DocumentView::from(document));
        context.insert("comments", &comments);
        context.insert("related", &related);
        Ok::<_, ApiError>(context)
    }
    .await;
    respond(&state, "document_detail.html", context)
}

async fn quiz_list(
    State(state): State<AppState>,
    query: Result<Query<QuizListQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let context = async {
        let filter: QuizFilter = query.filter()?;
        let params = list_params(query.page, query.limit, DEFAULT_LIMIT);
        let (page, categories) = tokio::try_join!(
            async { Ok::<_, ApiError>(state.quiz_service.list(&filter, &params).await?) },
            async { Ok::<_, ApiError>(state.quiz_service.categories().await?) },
        )?;

        let mut context = state.views.base_context();
        context.insert("categories", &categories);
        insert_page(
            &mut context,
            &page,
            query_pairs(&[
                ("search", query.search.as_deref()),
                ("category", query.category.as_deref()),
            ]),
        );
        Ok::<_, ApiError>(context)
    }
    .await;
    respond(&state, "quiz_list.html", context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_skip_blank_values() {
        let pairs = query_pairs(&[("search", Some(" calculus ")), ("subject", Some("")), ("tag", None)]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key, "search");
        assert_eq!(pairs[0].value, "calculus");
    }
}

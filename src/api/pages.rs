//! Public catalog pages
//!
//! - GET /                    - Home with counts and previews
//! - GET /{kind}              - Every entry of a kind
//! - GET /{kind}/{id}         - Detail page with links, comments and favorite state
//! - GET /health              - Liveness check

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{AppState, MaybeUser, PageError};
use crate::models::{CatalogKind, Comment, Entry};
use crate::services::naturaltime;

/// Entries shown per kind on the home page
const HOME_PREVIEW: i64 = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/{kind}", get(list_entries))
        .route("/{kind}/{id}", get(entry_detail))
}

/// Catalog kind from a path segment, 404 otherwise
pub fn parse_kind(slug: &str) -> Result<CatalogKind, PageError> {
    CatalogKind::from_slug(slug).ok_or_else(|| PageError::not_found(format!("No page at /{}", slug)))
}

/// Comment as shown on a page
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub username: String,
    pub text: String,
    /// Humanized age, e.g. "3 days ago"
    pub when: String,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            when: naturaltime(comment.created_on),
            username: comment.username,
            text: comment.user_comment,
        }
    }
}

#[derive(Debug, Serialize)]
struct HomeSection {
    slug: &'static str,
    label: &'static str,
    count: i64,
    entries: Vec<Entry>,
    latest_comment: Option<CommentView>,
}

/// GET / - Home page
async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let counts = state.catalog_service.counts().await?;

    let mut sections = Vec::with_capacity(CatalogKind::ALL.len());
    for kind in CatalogKind::ALL {
        let count = match kind {
            CatalogKind::Character => counts.characters,
            CatalogKind::Comic => counts.comics,
            CatalogKind::Series => counts.series,
        };
        sections.push(HomeSection {
            slug: kind.slug(),
            label: kind.label(),
            count,
            entries: state.catalog_service.preview(kind, HOME_PREVIEW).await?,
            latest_comment: state.comment_service.latest(kind).await?.map(CommentView::from),
        });
    }

    let mut context = tera::Context::new();
    context.insert("counts", &counts);
    context.insert("sections", &sections);

    let html = state.render("index.html", &context, uri.path(), user.as_ref())?;
    Ok(Html(html))
}

/// GET /{kind} - All characters, comics or series
async fn list_entries(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(kind): Path<String>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let kind = parse_kind(&kind)?;
    let entries = state.catalog_service.list(kind).await?;

    let mut context = tera::Context::new();
    context.insert("kind", kind.slug());
    context.insert("kind_label", kind.label());
    context.insert("entries", &entries);

    let html = state.render("list.html", &context, uri.path(), user.as_ref())?;
    Ok(Html(html))
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    /// Outcome of a comment submission
    pub comment: Option<String>,
}

fn comment_notice(outcome: Option<&str>) -> Option<&'static str> {
    match outcome? {
        "pending" => Some("Thanks! Your comment will appear once a moderator approves it."),
        "empty" => Some("Comments cannot be empty."),
        _ => None,
    }
}

/// GET /{kind}/{id} - Detail page
async fn entry_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<DetailQuery>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let kind = parse_kind(&kind)?;
    let id: i64 = id
        .parse()
        .map_err(|_| PageError::not_found(format!("No {} with id {}", kind.slug(), id)))?;

    let detail = state.catalog_service.detail(kind, id).await?;
    let comments: Vec<CommentView> = state
        .comment_service
        .list_active(kind, id)
        .await?
        .into_iter()
        .map(CommentView::from)
        .collect();

    let is_favorite = match user.as_ref() {
        Some(user) => state.favorite_service.is_favorite(user.id, kind, id).await?,
        None => false,
    };

    let mut context = tera::Context::new();
    context.insert("kind", kind.slug());
    context.insert("entry", &detail.entry);
    context.insert("characters", &detail.characters);
    context.insert("comics", &detail.comics);
    context.insert("series", &detail.series);
    context.insert("comments", &comments);
    context.insert("signed_in", &user.is_some());
    context.insert("is_favorite", &is_favorite);
    context.insert("notice", &comment_notice(query.comment.as_deref()));

    let html = state.render(kind.detail_template(), &context, uri.path(), user.as_ref())?;
    Ok(Html(html))
}

/// GET /health - 503 when the database does not answer
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            )
        }
    }
}

//! Admin API endpoints
//!
//! JSON endpoints under `/admin/api`, admin role required:
//! - Catalog CRUD with search
//! - Character appearance rows
//! - Comment moderation
//! - Profile medal and score
//! - Template reload

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    Appearance, CatalogCounts, CatalogKind, Comment, CommentFilter, CreateAppearanceInput, Entry,
    EntryInput, UpdateUserDataInput, UserData, WorkKind,
};

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/theme/reload", post(reload_theme))
        .route("/profiles/{user_id}", put(update_profile))
        .route("/comments/{kind}", get(list_comments))
        .route("/comments/{kind}/approve", post(approve_comments))
        .route("/appearances/{work}", get(list_appearances).post(create_appearance))
        .route("/appearances/{work}/{id}", axum::routing::delete(delete_appearance))
        .route("/{kind}", get(list_entries).post(create_entry))
        .route("/{kind}/{id}", put(update_entry).delete(delete_entry))
}

fn parse_kind(slug: &str) -> Result<CatalogKind, ApiError> {
    CatalogKind::from_slug(slug).ok_or_else(|| ApiError::not_found(format!("Unknown catalog kind: {}", slug)))
}

fn parse_work(slug: &str) -> Result<WorkKind, ApiError> {
    parse_kind(slug)
        .ok()
        .and_then(WorkKind::from_catalog)
        .ok_or_else(|| ApiError::not_found(format!("Unknown appearance kind: {}", slug)))
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub counts: CatalogCounts,
    /// Comments waiting for approval, per kind
    pub pending_comments: PendingComments,
}

#[derive(Debug, Serialize)]
pub struct PendingComments {
    pub characters: usize,
    pub comics: usize,
    pub series: usize,
}

/// GET /admin/api/dashboard
async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let counts = state.catalog_service.counts().await?;

    let pending = CommentFilter {
        active: Some(false),
        ..Default::default()
    };
    let mut pending_counts = [0usize; 3];
    for (slot, kind) in pending_counts.iter_mut().zip(CatalogKind::ALL) {
        *slot = state.comment_service.admin_list(kind, &pending).await?.len();
    }

    Ok(Json(DashboardResponse {
        counts,
        pending_comments: PendingComments {
            characters: pending_counts[0],
            comics: pending_counts[1],
            series: pending_counts[2],
        },
    }))
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub entry: Entry,
}

/// GET /admin/api/{kind}?q=
async fn list_entries(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<EntriesResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let entries = state.catalog_service.search(kind, query.q.as_deref()).await?;
    Ok(Json(EntriesResponse { entries }))
}

/// POST /admin/api/{kind}
async fn create_entry(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<EntryInput>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let kind = parse_kind(&kind)?;
    let entry = state.catalog_service.create(kind, body).await?;
    Ok((StatusCode::CREATED, Json(EntryResponse { entry })))
}

/// PUT /admin/api/{kind}/{id}
async fn update_entry(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    Json(body): Json<EntryInput>,
) -> Result<Json<EntryResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let entry = state.catalog_service.update(kind, id, body).await?;
    Ok(Json(EntryResponse { entry }))
}

/// DELETE /admin/api/{kind}/{id}
async fn delete_entry(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    state.catalog_service.delete(kind, id).await?;
    tracing::info!(admin = %user.username, kind = %kind, id, "Admin deleted entry");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Appearances
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AppearanceView {
    #[serde(flatten)]
    pub appearance: Appearance,
    /// "<Character> in <Comic/Series>"
    pub label: String,
}

impl From<Appearance> for AppearanceView {
    fn from(appearance: Appearance) -> Self {
        Self {
            label: appearance.to_string(),
            appearance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppearancesResponse {
    pub appearances: Vec<AppearanceView>,
}

/// GET /admin/api/appearances/{comics|series}
async fn list_appearances(
    State(state): State<AppState>,
    Path(work): Path<String>,
) -> Result<Json<AppearancesResponse>, ApiError> {
    let work = parse_work(&work)?;
    let appearances = state
        .catalog_service
        .list_appearances(work)
        .await?
        .into_iter()
        .map(AppearanceView::from)
        .collect();
    Ok(Json(AppearancesResponse { appearances }))
}

/// POST /admin/api/appearances/{comics|series}
async fn create_appearance(
    State(state): State<AppState>,
    Path(work): Path<String>,
    Json(body): Json<CreateAppearanceInput>,
) -> Result<(StatusCode, Json<AppearanceView>), ApiError> {
    let work = parse_work(&work)?;
    let appearance = state.catalog_service.create_appearance(work, body).await?;
    Ok((StatusCode::CREATED, Json(appearance.into())))
}

/// DELETE /admin/api/appearances/{comics|series}/{id}
async fn delete_appearance(
    State(state): State<AppState>,
    Path((work, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    let work = parse_work(&work)?;
    state.catalog_service.delete_appearance(work, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub approved: u64,
}

/// GET /admin/api/comments/{kind}?active=&since=&q=
async fn list_comments(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(filter): Query<CommentFilter>,
) -> Result<Json<CommentsResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let comments = state.comment_service.admin_list(kind, &filter).await?;
    Ok(Json(CommentsResponse { comments }))
}

/// POST /admin/api/comments/{kind}/approve
async fn approve_comments(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let approved = state.comment_service.approve(kind, &body.ids).await?;
    Ok(Json(ApproveResponse { approved }))
}

// ============================================================================
// Profiles
// ============================================================================

/// PUT /admin/api/profiles/{user_id}
async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<UpdateUserDataInput>,
) -> Result<Json<UserData>, ApiError> {
    let data = state.profile_service.update(user_id, &body).await?;
    Ok(Json(data))
}

// ============================================================================
// Theme
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub theme: String,
    pub overridden: Vec<String>,
}

/// POST /admin/api/theme/reload - Re-read theme overrides from disk
async fn reload_theme(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let mut engine = state
        .theme_engine
        .write()
        .map_err(|_| ApiError::internal_error("Theme engine lock poisoned"))?;

    engine
        .reload_templates()
        .map_err(|e| ApiError::validation_error(format!("Failed to reload templates: {}", e)))?;

    tracing::info!("Reloaded theme '{}'", engine.get_current_theme());
    Ok(Json(ReloadResponse {
        theme: engine.get_current_theme().to_string(),
        overridden: engine.overridden_templates().to_vec(),
    }))
}

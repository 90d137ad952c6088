//! API layer - HTTP handlers and routing
//!
//! - Public catalog pages
//! - Login, signup and logout
//! - Profile page and avatar endpoint
//! - Comment and favorite forms
//! - Admin JSON API under `/admin/api`

pub mod admin;
pub mod auth;
pub mod comments;
pub mod favorites;
pub mod middleware;
pub mod pages;
pub mod profile;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser, PageError};

use crate::config::Config;
use crate::db::repositories::{
    SqlxAppearanceRepository, SqlxCatalogRepository, SqlxCommentRepository,
    SqlxFavoriteRepository, SqlxProfileRepository, SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    CatalogService, CommentService, FavoriteService, ProfileService, UserService,
};
use crate::theme::ThemeEngine;
use std::sync::{Arc, RwLock};

/// Wire repositories, services and the theme engine into application state
pub fn build_state(pool: DynDatabasePool, config: &Config) -> anyhow::Result<AppState> {
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let catalog_repo = SqlxCatalogRepository::boxed(pool.clone());
    let appearance_repo = SqlxAppearanceRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let favorite_repo = SqlxFavoriteRepository::boxed(pool.clone());
    let profile_repo = SqlxProfileRepository::boxed(pool.clone());

    let user_service = UserService::with_session_expiration(
        user_repo.clone(),
        session_repo,
        config.session.ttl_days,
    );

    let theme_engine = ThemeEngine::new(&config.theme.path, &config.theme.active)?;

    Ok(AppState {
        pool,
        user_service: Arc::new(user_service),
        catalog_service: Arc::new(CatalogService::new(catalog_repo.clone(), appearance_repo)),
        comment_service: Arc::new(CommentService::new(comment_repo, catalog_repo.clone())),
        favorite_service: Arc::new(FavoriteService::new(favorite_repo, catalog_repo)),
        profile_service: Arc::new(ProfileService::new(profile_repo, user_repo)),
        theme_engine: Arc::new(RwLock::new(theme_engine)),
        site: Arc::new(config.site.clone()),
        origin: Arc::from(config.server.origin.as_str()),
    })
}

/// Build the admin API router (admin role required)
pub fn build_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/admin/api", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = match state.origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!("Invalid server origin '{}', CORS disabled", state.origin);
            CorsLayer::new()
        }
    };

    Router::new()
        .merge(auth::router())
        .merge(profile::router())
        .merge(comments::router())
        .merge(favorites::router())
        .merge(build_admin_router(state.clone()))
        .merge(pages::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_page_errors,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::origin_guard,
        ))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

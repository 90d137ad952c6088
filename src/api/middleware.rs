//! API middleware
//!
//! Contains:
//! - Shared application state
//! - JSON and HTML error responses
//! - Session extraction (cookie or bearer token)
//! - Authentication and admin authorization
//! - Cross-site origin guard for form posts

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::config::SiteConfig;
use crate::models::User;
use crate::services::{
    CatalogError, CatalogService, CommentError, CommentService, FavoriteError, FavoriteService,
    ProfileError, ProfileService, UserService, UserServiceError,
};
use crate::theme::{StandardTemplateVars, ThemeEngine};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Paths that accept cross-site posts
const ORIGIN_EXEMPT: &[&str] = &["/profile/avatar"];

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub catalog_service: Arc<CatalogService>,
    pub comment_service: Arc<CommentService>,
    pub favorite_service: Arc<FavoriteService>,
    pub profile_service: Arc<ProfileService>,
    pub theme_engine: Arc<RwLock<ThemeEngine>>,
    pub site: Arc<SiteConfig>,
    /// Origin this site is served from, e.g. `http://localhost:8080`
    pub origin: Arc<str>,
}

impl AppState {
    /// Render a page with the standard variables for `path` and `user`
    pub fn render(
        &self,
        template: &str,
        context: &tera::Context,
        path: &str,
        user: Option<&User>,
    ) -> Result<String, PageError> {
        let mut vars = StandardTemplateVars::new(&self.site.name, &self.site.description, path);
        if let Some(user) = user {
            vars = vars.with_user(user.into());
        }

        let engine = self
            .theme_engine
            .read()
            .map_err(|_| PageError::internal("Theme engine lock poisoned"))?;

        engine
            .render_with_standard_vars(template, context, &vars)
            .map_err(|e| PageError::internal(e.to_string()))
    }

    /// `Set-Cookie` value starting a session
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.user_service
                .session_expiration_days()
                .saturating_mul(24 * 60 * 60)
        )
    }
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// 302 redirect
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Redirect to the login page, returning to `next` afterwards
pub fn login_redirect(next: &str) -> Response {
    found(&format!("/login?next={}", urlencoding::encode(next)))
}

// ============================================================================
// JSON errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
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

    pub fn internal_error(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("Internal error: {}", message);
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(msg) => ApiError::not_found(msg),
            CatalogError::ValidationError(msg) => ApiError::validation_error(msg),
            CatalogError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<CommentError> for ApiError {
    fn from(e: CommentError) -> Self {
        match e {
            CommentError::NotFound(msg) => ApiError::not_found(msg),
            CommentError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::NotFound(msg) => ApiError::not_found(msg),
            ProfileError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

// ============================================================================
// HTML errors
// ============================================================================

/// Error for HTML pages.
///
/// The response carries the failure as an extension; [`render_page_errors`]
/// replaces the plain body with the themed `error.html` page.
#[derive(Debug, Clone)]
pub struct PageError {
    pub status: StatusCode,
    pub title: String,
    pub message: String,
}

impl PageError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            title: "Page not found".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("Page failed: {}", message);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            title: "Something went wrong".to_string(),
            message: "The page could not be displayed.".to_string(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let body = format!("{}: {}", self.title, self.message);
        let mut response = (self.status, body).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<CatalogError> for PageError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(msg) => PageError::not_found(msg),
            other => PageError::internal(other.to_string()),
        }
    }
}

impl From<CommentError> for PageError {
    fn from(e: CommentError) -> Self {
        match e {
            CommentError::NotFound(msg) => PageError::not_found(msg),
            other => PageError::internal(other.to_string()),
        }
    }
}

impl From<FavoriteError> for PageError {
    fn from(e: FavoriteError) -> Self {
        match e {
            FavoriteError::NotFound(msg) => PageError::not_found(msg),
            other => PageError::internal(other.to_string()),
        }
    }
}

impl From<ProfileError> for PageError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::NotFound(msg) => PageError::not_found(msg),
            other => PageError::internal(other.to_string()),
        }
    }
}

impl From<UserServiceError> for PageError {
    fn from(e: UserServiceError) -> Self {
        PageError::internal(e.to_string())
    }
}

/// Render `error.html` for responses carrying a [`PageError`]
pub async fn render_page_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(error) = response.extensions().get::<PageError>().cloned() else {
        return response;
    };

    let mut context = tera::Context::new();
    StandardTemplateVars::new(&state.site.name, &state.site.description, path).apply(&mut context);
    context.insert("status", &error.status.as_u16());
    context.insert("title", &error.title);
    context.insert("error_message", &error.message);

    let html = match state.theme_engine.read() {
        Ok(engine) => engine.render_with_fallback("error.html", &context),
        Err(_) => return response,
    };
    (error.status, axum::response::Html(html)).into_response()
}

// ============================================================================
// Sessions
// ============================================================================

/// Extract session token from the `Authorization: Bearer` header or the
/// session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Signed-in user, if the request carries a valid session
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

async fn resolve_user(parts: &mut Parts, state: &AppState) -> Option<User> {
    if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
        return Some(user.0.clone());
    }

    let token = extract_session_token(&parts.headers)?;
    match state.user_service.validate_session(&token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Session validation failed: {}", e);
            None
        }
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve_user(parts, state).await))
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state)
            .await
            .map(AuthenticatedUser)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(|e| ApiError::internal_error(format!("Session validation failed: {}", e)))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

// ============================================================================
// Origin guard
// ============================================================================

/// Whether a state-changing request must be rejected as cross-site.
///
/// Requests without an `Origin` header pass; so do the exempt paths.
pub fn is_cross_site(method: &Method, path: &str, origin: Option<&str>, allowed: &str) -> bool {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return false;
    }
    if ORIGIN_EXEMPT.contains(&path) {
        return false;
    }
    match origin {
        None => false,
        Some(origin) => origin.trim_end_matches('/') != allowed.trim_end_matches('/'),
    }
}

/// Reject cross-site form posts
pub async fn origin_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());

    if is_cross_site(request.method(), request.uri().path(), origin, &state.origin) {
        tracing::warn!(
            path = %request.uri().path(),
            origin = origin.unwrap_or_default(),
            "Rejected cross-site request"
        );
        return Err(ApiError::forbidden("Cross-site request rejected"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let headers = headers(header::AUTHORIZATION, "Bearer test-token-123");
        assert_eq!(extract_session_token(&headers), Some("test-token-123".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let headers = headers(header::COOKIE, "theme=dark; session=test-token-456");
        assert_eq!(extract_session_token(&headers), Some("test-token-456".to_string()));
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let mut headers = headers(header::AUTHORIZATION, "Bearer bearer-token");
        headers.insert(header::COOKIE, HeaderValue::from_static("session=cookie-token"));
        assert_eq!(extract_session_token(&headers), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_ignores_similar_names() {
        let headers = headers(header::COOKIE, "sessionid=abc; session=");
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn test_extract_session_token_none() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());
        let headers = headers(header::AUTHORIZATION, "Basic invalid");
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn test_api_error_status() {
        let cases = [
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (ApiError::internal_error("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_catalog_error_mapping() {
        let error: ApiError = CatalogError::ValidationError("bad".into()).into();
        assert_eq!(error.error.code, "VALIDATION_ERROR");
        let error: PageError = CatalogError::NotFound("gone".into()).into();
        assert_eq!(error.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_page_error_carries_extension() {
        let response = PageError::not_found("No comic").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<PageError>().is_some());
    }

    #[test]
    fn test_origin_guard_rules() {
        let site = "http://localhost:8080";
        assert!(!is_cross_site(&Method::GET, "/login", Some("https://evil.test"), site));
        assert!(!is_cross_site(&Method::POST, "/login", None, site));
        assert!(!is_cross_site(&Method::POST, "/login", Some("http://localhost:8080/"), site));
        assert!(is_cross_site(&Method::POST, "/login", Some("https://evil.test"), site));
        assert!(is_cross_site(&Method::DELETE, "/admin/api/comics/1", Some("null"), site));
        assert!(!is_cross_site(&Method::POST, "/profile/avatar", Some("https://evil.test"), site));
    }
}

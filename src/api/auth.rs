//! Authentication pages
//!
//! - GET/POST /login  - Log in with username (or email) and password
//! - GET/POST /signup - Create an account
//! - GET/POST /logout - End the session
//!
//! Failed form submissions re-render the form with status 200.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    clear_session_cookie, extract_session_token, AppState, MaybeUser, PageError,
};
use crate::services::user::{LoginInput, RegisterInput, UserServiceError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/signup", get(signup_page).post(signup))
        .route("/logout", get(logout).post(logout))
}

/// Where to go after logging in. Only local paths are accepted.
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would be
/// followed as `//host`; any control character falls back to `/`.
pub fn safe_next(next: Option<&str>) -> &str {
    let Some(path) = next.map(str::trim) else {
        return "/";
    };

    let local = path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
        && path
            .parse::<Uri>()
            .is_ok_and(|uri| uri.scheme().is_none() && uri.authority().is_none());

    if local {
        path
    } else {
        "/"
    }
}

/// 302 to `location` with a fresh session cookie
fn redirect_with_session(state: &AppState, location: &str, token: &str) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, state.session_cookie(token)),
        ],
    )
        .into_response()
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Login form fields
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

fn render_login(
    state: &AppState,
    username: &str,
    next: &str,
    error: Option<&str>,
) -> Result<Html<String>, PageError> {
    let mut context = tera::Context::new();
    context.insert("username", username);
    context.insert("next", next);
    context.insert("error", &error);
    Ok(Html(state.render("registration/login.html", &context, "/login", None)?))
}

/// GET /login
async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<LoginQuery>,
) -> Result<Response, PageError> {
    let next = safe_next(query.next.as_deref());
    if user.is_some() {
        return Ok(crate::api::middleware::found(next));
    }
    Ok(render_login(&state, "", next, None)?.into_response())
}

/// POST /login
async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, PageError> {
    let next = safe_next(form.next.as_deref()).to_string();
    let input = LoginInput::new(form.username.clone(), form.password);

    match state.user_service.login(input).await {
        Ok(session) => {
            tracing::info!(user_id = session.user_id, "User logged in");
            Ok(redirect_with_session(&state, &next, &session.id))
        }
        Err(UserServiceError::AuthenticationError(msg)) => {
            Ok(render_login(&state, &form.username, &next, Some(&msg))?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Signup
// ============================================================================

/// Signup form fields
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

fn render_signup(state: &AppState, form: &SignupForm, errors: &[String]) -> Result<Html<String>, PageError> {
    let mut context = tera::Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(Html(state.render("registration/signup.html", &context, "/signup", None)?))
}

/// GET /signup
async fn signup_page(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    render_signup(&state, &SignupForm::default(), &[])
}

/// POST /signup
async fn signup(State(state): State<AppState>, Form(form): Form<SignupForm>) -> Result<Response, PageError> {
    let input = RegisterInput {
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.firstname.clone(),
        last_name: form.lastname.clone(),
        password1: form.password1.clone(),
        password2: form.password2.clone(),
    };

    let user = match state.user_service.register(input).await {
        Ok(user) => user,
        Err(UserServiceError::ValidationError(msg)) | Err(UserServiceError::UserExists(msg)) => {
            return Ok(render_signup(&state, &form, &[msg])?.into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let session = state.user_service.start_session(user.id).await?;
    Ok(redirect_with_session(&state, "/", &session.id))
}

// ============================================================================
// Logout
// ============================================================================

/// GET/POST /logout - Always redirects home
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(e) = state.user_service.logout(&token).await {
            tracing::warn!("Failed to delete session on logout: {}", e);
        }
    }

    (
        StatusCode::FOUND,
        [
            (header::LOCATION, header::HeaderValue::from_static("/")),
            (header::SET_COOKIE, clear_session_cookie()),
        ],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/profile")), "/profile");
        assert_eq!(safe_next(Some("/comics/3?comment=pending")), "/comics/3?comment=pending");
        assert_eq!(safe_next(Some("https://evil.test/")), "/");
        assert_eq!(safe_next(Some("//evil.test")), "/");
        assert_eq!(safe_next(Some("/\\evil.test")), "/");
        assert_eq!(safe_next(Some("")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_safe_next_rejects_control_characters() {
        assert_eq!(safe_next(Some("/\t/evil.test")), "/");
        assert_eq!(safe_next(Some("/\r/evil.test")), "/");
        assert_eq!(safe_next(Some("/\n/evil.test")), "/");
        assert_eq!(safe_next(Some("/profile\r\nSet-Cookie: x=1")), "/");
        assert_eq!(safe_next(Some("/comics\u{0}")), "/");
        assert_eq!(safe_next(Some("/characters/1")), "/characters/1");
    }

    #[test]
    fn test_signup_form_never_serializes_passwords() {
        let form = SignupForm {
            username: "bucky".into(),
            password1: "secret".into(),
            password2: "secret".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&form).unwrap();
        assert!(json.contains("bucky"));
        assert!(!json.contains("secret"));
    }
}

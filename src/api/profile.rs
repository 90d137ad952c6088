//! Profile endpoints
//!
//! - GET  /profile        - Profile page (login required)
//! - POST /profile/avatar - Store a custom avatar URL (JSON)

use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{login_redirect, ApiError, AppState, AuthenticatedUser, MaybeUser, PageError};
use crate::models::{CatalogKind, Entry};
use crate::services::naturaltime;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile_page))
        .route("/profile/avatar", post(update_avatar))
}

#[derive(Debug, Serialize)]
struct FavoriteGroup<'a> {
    slug: &'static str,
    label: &'static str,
    entries: &'a [Entry],
}

/// GET /profile
async fn profile_page(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Response, PageError> {
    let Some(user) = user else {
        return Ok(login_redirect("/profile"));
    };

    let data = state.profile_service.get_or_create(user.id).await?;
    let favorites = state.favorite_service.all_for_user(user.id).await?;
    let groups = [
        FavoriteGroup {
            slug: CatalogKind::Character.slug(),
            label: CatalogKind::Character.label(),
            entries: &favorites.characters,
        },
        FavoriteGroup {
            slug: CatalogKind::Comic.slug(),
            label: CatalogKind::Comic.label(),
            entries: &favorites.comics,
        },
        FavoriteGroup {
            slug: CatalogKind::Series.slug(),
            label: CatalogKind::Series.label(),
            entries: &favorites.series,
        },
    ];

    let full_name = format!("{} {}", user.first_name.trim(), user.last_name.trim());

    let mut context = tera::Context::new();
    context.insert("username", &user.username);
    context.insert("email", &user.email);
    context.insert("full_name", full_name.trim());
    context.insert("profile_img_url", &data.avatar_url(&user.email));
    context.insert("custom_avatar", &data.profile_img_url);
    context.insert("medal_img", &data.medal_img);
    context.insert("scores", &data.scores);
    context.insert("date_joined", &naturaltime(user.created_at));
    context.insert("favorites", &favorites);
    context.insert("favorite_groups", &groups);
    context.insert("has_favorites", &!favorites.is_empty());

    let html = state.render("profile.html", &context, "/profile", Some(&user))?;
    Ok(Html(html).into_response())
}

/// Avatar update body. A missing `avatarUrl` clears the custom avatar.
#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub success: bool,
}

/// POST /profile/avatar
async fn update_avatar(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<AvatarRequest>,
) -> Result<Json<AvatarResponse>, ApiError> {
    state.profile_service.update_avatar(user.id, &body.avatar_url).await?;
    tracing::info!(user_id = user.id, "Updated avatar");
    Ok(Json(AvatarResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_request_defaults_to_empty() {
        let body: AvatarRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(body.avatar_url, "");

        let body: AvatarRequest = serde_json::from_str(r#"{"avatarUrl": "https://x.test/a.png"}"#).unwrap();
        assert_eq!(body.avatar_url, "https://x.test/a.png");
    }
}

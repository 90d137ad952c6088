//! Favorite toggling
//!
//! - POST /{kind}/{id}/favorite - Add or remove the entry from the user's favorites

use axum::{
    extract::{Path, State},
    response::Response,
    routing::post,
    Router,
};

use crate::api::middleware::{found, login_redirect, AppState, MaybeUser, PageError};
use crate::api::pages::parse_kind;

pub fn router() -> Router<AppState> {
    Router::new().route("/{kind}/{id}/favorite", post(toggle_favorite))
}

/// POST /{kind}/{id}/favorite - Redirects back to the entry
async fn toggle_favorite(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<Response, PageError> {
    let kind = parse_kind(&kind)?;
    let entry_path = format!("/{}/{}", kind.slug(), id);

    let Some(user) = user else {
        return Ok(login_redirect(&entry_path));
    };

    state.favorite_service.toggle(user.id, kind, id).await?;
    Ok(found(&entry_path))
}

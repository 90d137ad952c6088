//! Comment submission
//!
//! - POST /{kind}/{id}/comments - Submit a comment for moderation

use axum::{
    extract::{Path, State},
    response::Response,
    routing::post,
    Form, Router,
};
use serde::Deserialize;

use crate::api::middleware::{found, login_redirect, AppState, MaybeUser, PageError};
use crate::api::pages::parse_kind;
use crate::services::CommentError;

pub fn router() -> Router<AppState> {
    Router::new().route("/{kind}/{id}/comments", post(create_comment))
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub user_comment: String,
}

/// POST /{kind}/{id}/comments
///
/// Anonymous visitors are sent to the login page. Otherwise the visitor is
/// redirected back to the entry with the outcome in `?comment=`.
async fn create_comment(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((kind, id)): Path<(String, i64)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    let kind = parse_kind(&kind)?;
    let entry_path = format!("/{}/{}", kind.slug(), id);

    let Some(user) = user else {
        return Ok(login_redirect(&entry_path));
    };

    match state
        .comment_service
        .create(kind, id, user.id, &form.user_comment)
        .await
    {
        Ok(_) => Ok(found(&format!("{}?comment=pending", entry_path))),
        Err(CommentError::ValidationError(_)) => Ok(found(&format!("{}?comment=empty", entry_path))),
        Err(e) => Err(e.into()),
    }
}

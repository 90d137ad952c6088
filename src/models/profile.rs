//! Profile model
//!
//! `UserData` is the one-to-one profile record created lazily the first time
//! a user opens their profile page.

use serde::{Deserialize, Serialize};

/// Avatar URL, medal and score for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: i64,
    pub user_id: i64,
    /// Custom avatar, empty when unset
    pub profile_img_url: String,
    /// Medal image, empty when unset
    pub medal_img: String,
    pub scores: i64,
}

impl UserData {
    /// The custom avatar, or a Gravatar derived from `email`
    pub fn avatar_url(&self, email: &str) -> String {
        if self.profile_img_url.trim().is_empty() {
            gravatar_url(email)
        } else {
            self.profile_img_url.clone()
        }
    }
}

/// Gravatar URL for an email, the generic silhouette when the email is blank
pub fn gravatar_url(email: &str) -> String {
    let email = email.trim();
    if email.is_empty() {
        return "https://www.gravatar.com/avatar/?d=mp&s=160".to_string();
    }
    let hash = format!("{:x}", md5::compute(email.to_lowercase()));
    format!("https://www.gravatar.com/avatar/{}?d=mp&s=160", hash)
}

/// Admin update of medal and score; omitted fields are left as they are
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserDataInput {
    #[serde(default)]
    pub medal_img: Option<String>,
    #[serde(default)]
    pub scores: Option<i64>,
}

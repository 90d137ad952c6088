//! Session model

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Server-side login record referenced by the `session` cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque token (UUID v4)
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` that lasts `ttl_days`.
    ///
    /// Fails when the expiry is not representable.
    pub fn start(user_id: i64, ttl_days: i64) -> anyhow::Result<Self> {
        let now = Utc::now();
        let expires_at = Duration::try_days(ttl_days)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .with_context(|| format!("Session lifetime of {} days is out of range", ttl_days))?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            expires_at,
            created_at: now,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

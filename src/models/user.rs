//! User model
//!
//! Registered accounts. The first account ever created is an administrator,
//! everyone after that signs up as a member.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address, may be empty
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2 PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    /// Date joined
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build an unsaved user. The password must already be hashed with
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set first and last name
    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// "First Last", falling back to the username when both names are empty
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Can use the admin API
    Admin,
    #[default]
    Member,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Member => write!(f, "member"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "member" => Ok(UserRole::Member),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "logan".to_string(),
            "logan@xavier.edu".to_string(),
            "hashed".to_string(),
            UserRole::Member,
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "logan");
        assert!(user.first_name.is_empty());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_display_name() {
        let user = User::new("storm".into(), String::new(), "h".into(), UserRole::Member);
        assert_eq!(user.display_name(), "storm");

        let user = user.with_names("Ororo", "Munroe");
        assert_eq!(user.display_name(), "Ororo Munroe");

        let user = user.with_names("Ororo", "  ");
        assert_eq!(user.display_name(), "Ororo");
    }

    #[test]
    fn test_user_role_round_trip() {
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert_eq!(UserRole::Member.to_string(), "member");
        assert_eq!(UserRole::from_str("ADMIN").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("member").unwrap(), UserRole::Member);
        assert!(UserRole::from_str("author").is_err());
    }

    #[test]
    fn test_user_role_default() {
        assert_eq!(UserRole::default(), UserRole::Member);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("hulk".into(), "b@b.com".into(), "secret".into(), UserRole::Admin);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }
}

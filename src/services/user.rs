//! User service
//!
//! Registration, login, logout and session lookup.
//! The first account ever registered becomes an administrator.

use crate::db::repositories::{is_unique_violation, SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for accounts and sessions
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a user service whose sessions last `session_expiration_days`
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Session lifetime in days, used for the cookie `Max-Age`
    pub fn session_expiration_days(&self) -> i64 {
        self.session_expiration_days
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a blank username, mismatched or empty
    ///   passwords, or a malformed email
    /// - `UserExists` if the username or email is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        input.validate()?;

        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        if !email.is_empty()
            && self
                .user_repo
                .get_by_email(&email)
                .await
                .context("Failed to check email")?
                .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password1).context("Failed to hash password")?;
        let user = User::new(username, email, password_hash, UserRole::Member)
            .with_names(input.first_name.trim(), input.last_name.trim());

        // A concurrent signup can take the name between the check above and the insert
        let created = match self.user_repo.create_account(&user).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(format!(
                    "Username '{}' is already taken",
                    user.username
                )));
            }
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!(user_id = created.id, role = %created.role, "Registered user {}", created.username);
        Ok(created)
    }

    /// Check credentials and open a session.
    ///
    /// `username_or_email` matches a username first, then an email.
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .find_user_by_username_or_email(input.username_or_email.trim())
            .await?
            .ok_or_else(invalid)?;

        let valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            tracing::debug!(user_id = user.id, "Rejected login with wrong password");
            return Err(invalid());
        }

        self.start_session(user.id).await
    }

    /// Open a session for an already authenticated user
    pub async fn start_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, self.session_expiration_days)?;

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// Delete a session. Unknown tokens are not an error.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are deleted on sight and resolve to `None`.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// `true` while no account exists
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;

        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        if !username_or_email.contains('@') {
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_email(username_or_email)
            .await
            .context("Failed to get user by email")?;

        Ok(user)
    }
}

/// Signup form fields
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    /// Confirmation, must equal `password1`
    pub password2: String,
}

impl RegisterInput {
    /// Input with the password already confirmed and no names
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            email: email.into(),
            password2: password.clone(),
            password1: password,
            ..Default::default()
        }
    }

    /// Set first and last name
    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    fn validate(&self) -> Result<(), UserServiceError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username cannot be empty".to_string(),
            ));
        }
        if username.chars().count() > 150 {
            return Err(UserServiceError::ValidationError(
                "Username must be 150 characters or fewer".to_string(),
            ));
        }
        if self.password1.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }
        if self.password1 != self.password2 {
            return Err(UserServiceError::ValidationError(
                "The two password fields didn't match".to_string(),
            ));
        }
        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        Ok(())
    }
}

/// Login form fields
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::setup_pool;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::DynDatabasePool;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = setup_pool().await;
        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let (_pool, service) = setup_test_service().await;

        let first = service
            .register(RegisterInput::new("nick", "fury@shield.gov", "password123"))
            .await
            .expect("Failed to register");
        let second = service
            .register(RegisterInput::new("maria", "hill@shield.gov", "password123"))
            .await
            .expect("Failed to register");

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::Member);
    }

    #[tokio::test]
    async fn test_concurrent_first_signups_make_one_admin() {
        let (_pool, service) = setup_test_service().await;

        let (a, b) = tokio::join!(
            service.register(RegisterInput::new("thor", "", "pw")),
            service.register(RegisterInput::new("loki", "", "pw")),
        );
        let roles = [a.unwrap().role, b.unwrap().role];

        assert_eq!(roles.iter().filter(|r| **r == UserRole::Admin).count(), 1);
        assert_eq!(roles.iter().filter(|r| **r == UserRole::Member).count(), 1);
    }

    /// Lookups that never find anyone, as if another signup raced past them
    struct StaleLookups(Arc<dyn UserRepository>);

    #[async_trait::async_trait]
    impl UserRepository for StaleLookups {
        async fn create(&self, user: &User) -> anyhow::Result<User> {
            self.0.create(user).await
        }
        async fn create_account(&self, user: &User) -> anyhow::Result<User> {
            self.0.create_account(user).await
        }
        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
            self.0.get_by_id(id).await
        }
        async fn get_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn get_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn count(&self) -> anyhow::Result<i64> {
            self.0.count().await
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_at_insert_is_user_exists() {
        let pool = setup_pool().await;
        let service = UserService::new(
            Arc::new(StaleLookups(SqlxUserRepository::boxed(pool.clone()))),
            SqlxSessionRepository::boxed(pool.clone()),
        );
        service.register(RegisterInput::new("peter", "", "pw")).await.unwrap();

        let result = service.register(RegisterInput::new("peter", "", "pw")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_stores_names() {
        let (_pool, service) = setup_test_service().await;

        let user = service
            .register(RegisterInput::new("bruce", "", "gamma").with_names(" Bruce ", "Banner"))
            .await
            .unwrap();

        assert_eq!(user.first_name, "Bruce");
        assert_eq!(user.last_name, "Banner");
        assert_eq!(user.email, "");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_fails() {
        let (_pool, service) = setup_test_service().await;
        service.register(RegisterInput::new("tony", "", "pw")).await.unwrap();

        let result = service.register(RegisterInput::new("tony", "", "pw")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_fails_but_blank_is_fine() {
        let (_pool, service) = setup_test_service().await;
        service.register(RegisterInput::new("a", "same@example.com", "pw")).await.unwrap();
        service.register(RegisterInput::new("b", "", "pw")).await.unwrap();
        service.register(RegisterInput::new("c", "", "pw")).await.unwrap();

        let result = service.register(RegisterInput::new("d", "same@example.com", "pw")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_pool, service) = setup_test_service().await;

        let cases = [
            RegisterInput::new("   ", "", "pw"),
            RegisterInput::new("x", "", ""),
            RegisterInput::new("x", "no-at-sign", "pw"),
            RegisterInput {
                password2: "different".into(),
                ..RegisterInput::new("x", "", "pw")
            },
        ];

        for input in cases {
            let result = service.register(input).await;
            assert!(matches!(result, Err(UserServiceError::ValidationError(_))));
        }
        assert!(service.is_first_user().await.unwrap());
    }

    // ========================================================================
    // Login, sessions, logout
    // ========================================================================

    #[tokio::test]
    async fn test_login_with_username_or_email() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("steve", "steve@avengers.org", "shield"))
            .await
            .unwrap();

        let by_name = service.login(LoginInput::new("steve", "shield")).await.unwrap();
        let by_email = service.login(LoginInput::new("steve@avengers.org", "shield")).await.unwrap();

        assert_eq!(by_name.user_id, user.id);
        assert_eq!(by_email.user_id, user.id);
        assert_ne!(by_name.id, by_email.id);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (_pool, service) = setup_test_service().await;
        service.register(RegisterInput::new("bucky", "", "arm")).await.unwrap();

        let wrong_password = service.login(LoginInput::new("bucky", "leg")).await;
        let unknown_user = service.login(LoginInput::new("zemo", "arm")).await;

        assert!(matches!(wrong_password, Err(UserServiceError::AuthenticationError(_))));
        assert!(matches!(unknown_user, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_validate_session() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(RegisterInput::new("sharon", "", "agent13")).await.unwrap();
        let session = service.login(LoginInput::new("sharon", "agent13")).await.unwrap();

        let resolved = service.validate_session(&session.id).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));
        assert!(service.validate_session("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_deleted() {
        let (pool, service) = setup_test_service().await;
        let user = service.register(RegisterInput::new("peggy", "", "ssr")).await.unwrap();

        let mut session = Session::start(user.id, 7).unwrap();
        session.expires_at = Utc::now() - Duration::minutes(1);
        SqlxSessionRepository::new(pool.clone()).create(&session).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(pool.sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_logout() {
        let (_pool, service) = setup_test_service().await;
        service.register(RegisterInput::new("sam", "", "wings")).await.unwrap();
        let session = service.login(LoginInput::new("sam", "wings")).await.unwrap();

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());

        service.logout("never-existed").await.expect("Unknown token is not an error");
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let (pool, service) = setup_test_service().await;
        let user = service.register(RegisterInput::new("rhodey", "", "warmachine")).await.unwrap();
        let repo = SqlxSessionRepository::new(pool.clone());

        let mut expired = Session::start(user.id, 1).unwrap();
        expired.expires_at = Utc::now() - Duration::days(1);
        repo.create(&expired).await.unwrap();
        service.start_session(user.id).await.unwrap();

        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_custom_session_expiration() {
        let pool = setup_pool().await;
        let service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            30,
        );
        let user = service.register(RegisterInput::new("vision", "", "mind")).await.unwrap();

        let session = service.start_session(user.id).await.unwrap();
        assert_eq!((session.expires_at - session.created_at).num_days(), 30);
        assert_eq!(service.session_expiration_days(), 30);
    }

    // ========================================================================
    // Properties
    // ========================================================================

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        /// A registered user can log in and the session resolves back to them.
        #[test]
        fn register_login_roundtrip(
            username in "[a-z]{3,10}",
            password in "[a-zA-Z0-9!@#$%^&*]{8,20}"
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let (_pool, service) = setup_test_service().await;
                let username = format!("{}_{}", username, TEST_COUNTER.fetch_add(1, Ordering::SeqCst));

                let registered = service
                    .register(RegisterInput::new(username.clone(), "", password.clone()))
                    .await
                    .expect("Registration should succeed");
                let session = service
                    .login(LoginInput::new(username, password.clone()))
                    .await
                    .expect("Login should succeed");
                let resolved = service
                    .validate_session(&session.id)
                    .await
                    .expect("Validation should not error")
                    .expect("Session should resolve");

                prop_assert_eq!(resolved.id, registered.id);
                prop_assert_ne!(resolved.password_hash, password);
                Ok(())
            });
            result?;
        }
    }
}

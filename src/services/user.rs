//! User service
//!
//! Implements business logic for accounts:
//! - Registration (the first user becomes admin)
//! - Username/password authentication
//! - Lookups used by the bearer middleware

use crate::db::repositories::{is_unique_violation, UserRepository};
use crate::models::{CreateUserInput, User};
use crate::services::password::{hash_password, verify_dummy, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials or inactive account)
    #[error("{0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if username, email or password is blank, or the email has no `@`
    /// - `UserExists` if username or email is already taken
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();
        Self::validate_register_input(&username, &email, &input.password)?;

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

        if self
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

        let is_first = self.is_first_user().await?;
        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let mut user = User::new(username, email, password_hash, is_first);
        user.full_name = input
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(format!(
                    "Username '{}' or its email is already registered",
                    user.username
                )));
            }
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!(
            "Registered user '{}' (id {}, admin: {})",
            created.username,
            created.id,
            created.is_admin
        );
        Ok(created)
    }

    fn validate_register_input(username: &str, email: &str, password: &str) -> Result<(), UserServiceError> {
        if username.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username cannot be empty".to_string(),
            ));
        }
        if username.len() > 50 {
            return Err(UserServiceError::ValidationError(
                "Username cannot exceed 50 characters".to_string(),
            ));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "A valid email address is required".to_string(),
            ));
        }
        if password.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Check username and password.
    ///
    /// Unknown users and wrong passwords produce the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Incorrect username or password".to_string());

        let user = match self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to look up user")?
        {
            Some(user) => user,
            None => {
                verify_dummy(password);
                return Err(invalid());
            }
        };

        if !verify_password(password, &user.password_hash).context("Failed to verify password")? {
            tracing::debug!("Failed login for user '{}'", user.username);
            return Err(invalid());
        }

        if !user.is_active {
            return Err(UserServiceError::AuthenticationError("Inactive user".to_string()));
        }

        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await.context("Failed to get user")?)
    }

    /// Get a user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user")?)
    }

    /// Whether no user has registered yet
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let service = UserService::new(SqlxUserRepository::boxed(pool.clone()));
        (pool, service)
    }

    #[tokio::test]
    async fn test_first_user_is_admin_second_is_not() {
        let (_pool, service) = setup_test_service().await;

        let first = service
            .register(CreateUserInput::new("schwob", "schwob@example.com", "pw1"))
            .await
            .unwrap();
        let second = service
            .register(CreateUserInput::new("rider", "rider@example.com", "pw2"))
            .await
            .unwrap();

        assert!(first.is_admin);
        assert!(!second.is_admin);
        assert!(second.is_active);
        assert_ne!(second.password_hash, "pw2");
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(CreateUserInput::new("schwob", "schwob@example.com", "pw"))
            .await
            .unwrap();

        let same_name = service
            .register(CreateUserInput::new("schwob", "other@example.com", "pw"))
            .await;
        let same_email = service
            .register(CreateUserInput::new("other", "schwob@example.com", "pw"))
            .await;

        assert!(matches!(same_name, Err(UserServiceError::UserExists(_))));
        assert!(matches!(same_email, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_pool, service) = setup_test_service().await;

        for input in [
            CreateUserInput::new(" ", "a@example.com", "pw"),
            CreateUserInput::new("a", "not-an-email", "pw"),
            CreateUserInput::new("a", "a@example.com", "  "),
            CreateUserInput::new("x".repeat(51), "a@example.com", "pw"),
        ] {
            assert!(matches!(
                service.register(input).await,
                Err(UserServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(CreateUserInput::new("schwob", "schwob@example.com", "kette"))
            .await
            .unwrap();

        let authed = service.authenticate("schwob", "kette").await.unwrap();
        assert_eq!(authed.id, user.id);

        let wrong = service.authenticate("schwob", "wrong").await;
        let unknown = service.authenticate("nobody", "kette").await;
        for result in [wrong, unknown] {
            match result {
                Err(UserServiceError::AuthenticationError(msg)) => {
                    assert_eq!(msg, "Incorrect username or password")
                }
                other => panic!("unexpected result: {:?}", other.map(|u| u.username)),
            }
        }
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_authenticate() {
        let (pool, service) = setup_test_service().await;
        service
            .register(CreateUserInput::new("sleepy", "sleepy@example.com", "pw"))
            .await
            .unwrap();
        sqlx::query("UPDATE users SET is_active = 0 WHERE username = 'sleepy'")
            .execute(pool.sqlite().unwrap())
            .await
            .unwrap();

        match service.authenticate("sleepy", "pw").await {
            Err(UserServiceError::AuthenticationError(msg)) => assert_eq!(msg, "Inactive user"),
            other => panic!("unexpected result: {:?}", other.map(|u| u.username)),
        }
    }
}

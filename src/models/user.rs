//! User model
//!
//! Users own profiles and authenticate with username and password.
//! Write access to the blog is limited to users flagged `is_admin`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    pub full_name: Option<String>,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Inactive users cannot log in
    pub is_active: bool,
    pub is_admin: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active User.
    ///
    /// Note: The password should already be hashed before calling this function.
    /// Use `services::password::hash_password()` to hash the password.
    pub fn new(username: String, email: String, password_hash: String, is_admin: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            full_name: None,
            password_hash,
            is_active: true,
            is_admin,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl CreateUserInput {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            full_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "schwob".to_string(),
            "schwob@example.com".to_string(),
            "hash".to_string(),
            true,
        );

        assert_eq!(user.id, 0);
        assert!(user.is_active);
        assert!(user.is_admin);
        assert!(user.full_name.is_none());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new(
            "rider".to_string(),
            "rider@example.com".to_string(),
            "secret_hash".to_string(),
            false,
        );

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret_hash"));
        assert!(!json.contains("password_hash"));
        assert!(json.contains("\"is_admin\":false"));
    }
}

//! Profile repository
//!
//! Database operations for author profiles. `social_links` is stored as a
//! JSON string in a TEXT column.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Profile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const PROFILE_COLUMNS: &str = "id, user_id, nickname, bio, location, website, avatar_url, email, \
    social_links, created_at, updated_at";

/// Profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Create a new profile
    async fn create(&self, profile: &Profile) -> Result<Profile>;

    /// Get profile by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Profile>>;

    /// Get the profile owned by a user
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>>;

    /// List profiles ordered by ID
    async fn list(&self, params: ListParams) -> Result<Vec<Profile>>;

    /// Persist every column of `profile` except its owner
    async fn update(&self, profile: &Profile) -> Result<Profile>;

    /// Delete a profile. Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based profile repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    /// Create a new SQLx profile repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn create(&self, profile: &Profile) -> Result<Profile> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_profile_sqlite(self.pool.sqlite()?, profile).await,
            DatabaseDriver::Mysql => create_profile_mysql(self.pool.mysql()?, profile).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_profile_sqlite(self.pool.sqlite()?, "id", id).await,
            DatabaseDriver::Mysql => get_profile_mysql(self.pool.mysql()?, "id", id).await,
        }
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_profile_sqlite(self.pool.sqlite()?, "user_id", user_id).await,
            DatabaseDriver::Mysql => get_profile_mysql(self.pool.mysql()?, "user_id", user_id).await,
        }
    }

    async fn list(&self, params: ListParams) -> Result<Vec<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_profiles_sqlite(self.pool.sqlite()?, params).await,
            DatabaseDriver::Mysql => list_profiles_mysql(self.pool.mysql()?, params).await,
        }
    }

    async fn update(&self, profile: &Profile) -> Result<Profile> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_profile_sqlite(self.pool.sqlite()?, profile).await,
            DatabaseDriver::Mysql => update_profile_mysql(self.pool.mysql()?, profile).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM profiles WHERE id = ?")
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM profiles WHERE id = ?")
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete profile")?;

        Ok(affected > 0)
    }
}

fn encode_social_links(profile: &Profile) -> Result<Option<String>> {
    profile
        .social_links
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to encode social links")
}

fn decode_social_links(raw: Option<String>) -> Result<Option<serde_json::Value>> {
    raw.filter(|s| !s.is_empty())
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .context("Invalid social links JSON in database")
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_profile_sqlite(pool: &SqlitePool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO profiles (user_id, nickname, bio, location, website, avatar_url, email, social_links, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.nickname)
    .bind(&profile.bio)
    .bind(&profile.location)
    .bind(&profile.website)
    .bind(&profile.avatar_url)
    .bind(&profile.email)
    .bind(encode_social_links(profile)?)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create profile")?;

    Ok(Profile {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..profile.clone()
    })
}

// `column` is either "id" or "user_id".
async fn get_profile_sqlite(pool: &SqlitePool, column: &str, value: i64) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE {} = ?", PROFILE_COLUMNS, column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get profile by {}", column))?;

    row.as_ref().map(row_to_profile_sqlite).transpose()
}

async fn list_profiles_sqlite(pool: &SqlitePool, params: ListParams) -> Result<Vec<Profile>> {
    let sql = format!("SELECT {} FROM profiles ORDER BY id ASC LIMIT ? OFFSET ?", PROFILE_COLUMNS);
    let rows = sqlx::query(&sql)
        .bind(params.limit)
        .bind(params.skip)
        .fetch_all(pool)
        .await
        .context("Failed to list profiles")?;

    rows.iter().map(row_to_profile_sqlite).collect()
}

async fn update_profile_sqlite(pool: &SqlitePool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE profiles
        SET nickname = ?, bio = ?, location = ?, website = ?, avatar_url = ?, email = ?,
            social_links = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.nickname)
    .bind(&profile.bio)
    .bind(&profile.location)
    .bind(&profile.website)
    .bind(&profile.avatar_url)
    .bind(&profile.email)
    .bind(encode_social_links(profile)?)
    .bind(now)
    .bind(profile.id)
    .execute(pool)
    .await
    .context("Failed to update profile")?;

    Ok(Profile {
        updated_at: now,
        ..profile.clone()
    })
}

fn row_to_profile_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        nickname: row.try_get("nickname")?,
        bio: row.try_get("bio")?,
        location: row.try_get("location")?,
        website: row.try_get("website")?,
        avatar_url: row.try_get("avatar_url")?,
        email: row.try_get("email")?,
        social_links: decode_social_links(row.try_get("social_links")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_profile_mysql(pool: &MySqlPool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO profiles (user_id, nickname, bio, location, website, avatar_url, email, social_links, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.nickname)
    .bind(&profile.bio)
    .bind(&profile.location)
    .bind(&profile.website)
    .bind(&profile.avatar_url)
    .bind(&profile.email)
    .bind(encode_social_links(profile)?)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create profile")?;

    Ok(Profile {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..profile.clone()
    })
}

async fn get_profile_mysql(pool: &MySqlPool, column: &str, value: i64) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE {} = ?", PROFILE_COLUMNS, column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get profile by {}", column))?;

    row.as_ref().map(row_to_profile_mysql).transpose()
}

async fn list_profiles_mysql(pool: &MySqlPool, params: ListParams) -> Result<Vec<Profile>> {
    let sql = format!("SELECT {} FROM profiles ORDER BY id ASC LIMIT ? OFFSET ?", PROFILE_COLUMNS);
    let rows = sqlx::query(&sql)
        .bind(params.limit)
        .bind(params.skip)
        .fetch_all(pool)
        .await
        .context("Failed to list profiles")?;

    rows.iter().map(row_to_profile_mysql).collect()
}

async fn update_profile_mysql(pool: &MySqlPool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE profiles
        SET nickname = ?, bio = ?, location = ?, website = ?, avatar_url = ?, email = ?,
            social_links = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.nickname)
    .bind(&profile.bio)
    .bind(&profile.location)
    .bind(&profile.website)
    .bind(&profile.avatar_url)
    .bind(&profile.email)
    .bind(encode_social_links(profile)?)
    .bind(now)
    .bind(profile.id)
    .execute(pool)
    .await
    .context("Failed to update profile")?;

    Ok(Profile {
        updated_at: now,
        ..profile.clone()
    })
}

fn row_to_profile_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        nickname: row.try_get("nickname")?,
        bio: row.try_get("bio")?,
        location: row.try_get("location")?,
        website: row.try_get("website")?,
        avatar_url: row.try_get("avatar_url")?,
        email: row.try_get("email")?,
        social_links: decode_social_links(row.try_get("social_links")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::is_unique_violation;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxProfileRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxProfileRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, 'hash')")
            .bind(username)
            .bind(format!("{}@example.com", username))
            .execute(pool)
            .await
            .expect("Failed to create test user")
            .last_insert_rowid()
    }

    fn test_profile(user_id: i64, nickname: &str) -> Profile {
        let now = Utc::now();
        Profile {
            id: 0,
            user_id,
            nickname: nickname.to_string(),
            bio: None,
            location: Some("Schwäbische Alb".to_string()),
            website: None,
            avatar_url: None,
            email: None,
            social_links: Some(serde_json::json!({"instagram": "@sattl"})),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.sqlite().unwrap(), "schwob").await;

        let created = repo.create(&test_profile(user_id, "Schwob")).await.unwrap();

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("not found");
        let by_user = repo.get_by_user_id(user_id).await.unwrap().expect("not found");
        assert_eq!(by_id.id, by_user.id);
        assert_eq!(by_id.nickname, "Schwob");
        assert_eq!(by_id.social_links, Some(serde_json::json!({"instagram": "@sattl"})));
        assert!(repo.get_by_user_id(99999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_profile_for_user_is_rejected() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.sqlite().unwrap(), "schwob").await;
        repo.create(&test_profile(user_id, "One")).await.unwrap();

        let err = repo.create(&test_profile(user_id, "Two")).await.unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_update_list_delete() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.sqlite().unwrap();
        let first = create_test_user(sqlite, "a").await;
        let second = create_test_user(sqlite, "b").await;
        let mut profile = repo.create(&test_profile(first, "A")).await.unwrap();
        repo.create(&test_profile(second, "B")).await.unwrap();

        profile.bio = Some("Gravel enjoyer".to_string());
        profile.social_links = None;
        repo.update(&profile).await.unwrap();

        let found = repo.get_by_id(profile.id).await.unwrap().unwrap();
        assert_eq!(found.bio.as_deref(), Some("Gravel enjoyer"));
        assert!(found.social_links.is_none());

        assert_eq!(repo.list(ListParams::new(0, 10)).await.unwrap().len(), 2);
        assert!(repo.delete(profile.id).await.unwrap());
        assert!(!repo.delete(profile.id).await.unwrap());
        assert_eq!(repo.list(ListParams::new(0, 10)).await.unwrap().len(), 1);
    }
}

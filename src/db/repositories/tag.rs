//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL
//!
//! Attaching tags to adventures lives in the adventure repository, since
//! replacing a tag set has to share the adventure's transaction.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get tag by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Get tags for an adventure ordered by name
    async fn get_by_adventure_id(&self, adventure_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.sqlite()?, tag).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.mysql()?, tag).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_tag_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_column_sqlite(self.pool.sqlite()?, "slug", slug).await,
            DatabaseDriver::Mysql => get_tag_by_column_mysql(self.pool.mysql()?, "slug", slug).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_column_sqlite(self.pool.sqlite()?, "name", name).await,
            DatabaseDriver::Mysql => get_tag_by_column_mysql(self.pool.mysql()?, "name", name).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_tags_mysql(self.pool.mysql()?).await,
        }
    }

    async fn get_by_adventure_id(&self, adventure_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tags_by_adventure_sqlite(self.pool.sqlite()?, adventure_id).await
            }
            DatabaseDriver::Mysql => {
                get_tags_by_adventure_mysql(self.pool.mysql()?, adventure_id).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?)")
        .bind(&tag.name)
        .bind(&tag.slug)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        name: tag.name.clone(),
        slug: tag.slug.clone(),
    })
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, slug FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    row.as_ref().map(row_to_tag_sqlite).transpose()
}

// `column` is always one of our own literals, never user input.
async fn get_tag_by_column_sqlite(pool: &SqlitePool, column: &str, value: &str) -> Result<Option<Tag>> {
    let sql = format!("SELECT id, name, slug FROM tags WHERE {} = ?", column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag by {}", column))?;

    row.as_ref().map(row_to_tag_sqlite).transpose()
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, slug FROM tags ORDER BY name ASC")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_sqlite).collect()
}

pub(crate) async fn get_tags_by_adventure_sqlite(pool: &SqlitePool, adventure_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.slug
        FROM tags t
        INNER JOIN adventure_tags j ON t.id = j.tag_id
        WHERE j.adventure_id = ?
        ORDER BY t.name ASC
        "#,
    )
    .bind(adventure_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for adventure")?;

    rows.iter().map(row_to_tag_sqlite).collect()
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?)")
        .bind(&tag.name)
        .bind(&tag.slug)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        name: tag.name.clone(),
        slug: tag.slug.clone(),
    })
}

async fn get_tag_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, slug FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    row.as_ref().map(row_to_tag_mysql).transpose()
}

async fn get_tag_by_column_mysql(pool: &MySqlPool, column: &str, value: &str) -> Result<Option<Tag>> {
    let sql = format!("SELECT id, name, slug FROM tags WHERE {} = ?", column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag by {}", column))?;

    row.as_ref().map(row_to_tag_mysql).transpose()
}

async fn list_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, slug FROM tags ORDER BY name ASC")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_mysql).collect()
}

pub(crate) async fn get_tags_by_adventure_mysql(pool: &MySqlPool, adventure_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.slug
        FROM tags t
        INNER JOIN adventure_tags j ON t.id = j.tag_id
        WHERE j.adventure_id = ?
        ORDER BY t.name ASC
        "#,
    )
    .bind(adventure_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for adventure")?;

    rows.iter().map(row_to_tag_mysql).collect()
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::db::repositories::is_unique_violation;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_adventure(pool: &SqlitePool, slug: &str) -> i64 {
        sqlx::query("INSERT INTO adventures (title, slug, description, content) VALUES (?, ?, 'd', 'c')")
            .bind(slug)
            .bind(slug)
            .execute(pool)
            .await
            .expect("Failed to create test adventure")
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_create_tag() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo.create(&Tag::new("Gravel")).await.expect("Failed to create tag");

        assert!(created.id > 0);
        assert_eq!(created.slug, "gravel");
        assert_eq!(created.name, "Gravel");
    }

    #[tokio::test]
    async fn test_create_duplicate_name_is_unique_violation() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&Tag::new("Gravel")).await.unwrap();

        let err = repo.create(&Tag::new("Gravel")).await.unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_lookups() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&Tag::new("Schwäbische Alb")).await.unwrap();

        let by_id = repo.get_by_id(created.id).await.unwrap();
        let by_name = repo.get_by_name("Schwäbische Alb").await.unwrap();
        let by_slug = repo.get_by_slug("schwäbische-alb").await.unwrap();

        assert_eq!(by_id.as_ref(), Some(&created));
        assert_eq!(by_name.as_ref(), Some(&created));
        assert_eq!(by_slug.as_ref(), Some(&created));

        assert!(repo.get_by_id(99999).await.unwrap().is_none());
        assert!(repo.get_by_name("schwäbische alb").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_tags_ordered_by_name() {
        let (_pool, repo) = setup_test_repo().await;
        for name in ["Zelten", "Alb", "Mittelgebirge"] {
            repo.create(&Tag::new(name)).await.unwrap();
        }

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();

        assert_eq!(names, vec!["Alb", "Mittelgebirge", "Zelten"]);
    }

    #[tokio::test]
    async fn test_get_by_adventure_id() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.sqlite().unwrap();
        let adventure_id = create_test_adventure(sqlite, "alb").await;
        let other_id = create_test_adventure(sqlite, "donau").await;
        let gravel = repo.create(&Tag::new("Gravel")).await.unwrap();
        let camping = repo.create(&Tag::new("Camping")).await.unwrap();

        for (adventure, tag) in [(adventure_id, gravel.id), (adventure_id, camping.id), (other_id, gravel.id)] {
            sqlx::query("INSERT INTO adventure_tags (adventure_id, tag_id) VALUES (?, ?)")
                .bind(adventure)
                .bind(tag)
                .execute(sqlite)
                .await
                .unwrap();
        }

        let tags = repo.get_by_adventure_id(adventure_id).await.unwrap();
        assert_eq!(tags, vec![camping, gravel.clone()]);

        let tags = repo.get_by_adventure_id(other_id).await.unwrap();
        assert_eq!(tags, vec![gravel]);
    }
}

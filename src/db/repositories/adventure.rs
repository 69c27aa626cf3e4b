//! Adventure repository
//!
//! Database operations for adventures and their tag associations.
//!
//! This module provides:
//! - `AdventureRepository` trait defining the interface for adventure data access
//! - `SqlxAdventureRepository` implementing the trait for SQLite and MySQL
//!
//! Inserting or updating an adventure together with its tag set happens in a
//! single transaction, so a failed tag insert never leaves a half-tagged row.

use crate::config::DatabaseDriver;
use crate::db::repositories::tag::{get_tags_by_adventure_mysql, get_tags_by_adventure_sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Adventure, AdventureStatus, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

const ADVENTURE_COLUMNS: &str = "id, title, slug, description, content, status, location, \
    start_date, end_date, duration_days, distance_km, elevation_m, difficulty, surface, \
    gpx_file_path, start_coordinates, equipment_notes, tips, cover_image, user_id, \
    created_at, updated_at";

/// Adventure repository trait
#[async_trait]
pub trait AdventureRepository: Send + Sync {
    /// List adventures newest first, optionally filtered by status
    async fn list(&self, params: ListParams, status: Option<AdventureStatus>) -> Result<Vec<Adventure>>;

    /// Get adventure by ID, tags included
    async fn get_by_id(&self, id: i64) -> Result<Option<Adventure>>;

    /// Get adventure by slug, tags included
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Adventure>>;

    /// Check if a slug is taken by any adventure other than `exclude_id`
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Insert an adventure and attach `tag_ids` in one transaction
    async fn create(&self, adventure: &Adventure, tag_ids: &[i64]) -> Result<Adventure>;

    /// Persist every column of `adventure`.
    ///
    /// When `tag_ids` is `Some`, the tag set is replaced in the same transaction.
    async fn update(&self, adventure: &Adventure, tag_ids: Option<&[i64]>) -> Result<Adventure>;

    /// Delete an adventure. Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based adventure repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxAdventureRepository {
    pool: DynDatabasePool,
}

impl SqlxAdventureRepository {
    /// Create a new SQLx adventure repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AdventureRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AdventureRepository for SqlxAdventureRepository {
    async fn list(&self, params: ListParams, status: Option<AdventureStatus>) -> Result<Vec<Adventure>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_adventures_sqlite(self.pool.sqlite()?, params, status).await,
            DatabaseDriver::Mysql => list_adventures_mysql(self.pool.mysql()?, params, status).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Adventure>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_adventure_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_adventure_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Adventure>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_adventure_by_slug_sqlite(self.pool.sqlite()?, slug).await,
            DatabaseDriver::Mysql => get_adventure_by_slug_mysql(self.pool.mysql()?, slug).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_sqlite(self.pool.sqlite()?, slug, exclude_id).await
            }
            DatabaseDriver::Mysql => {
                exists_by_slug_mysql(self.pool.mysql()?, slug, exclude_id).await
            }
        }
    }

    async fn create(&self, adventure: &Adventure, tag_ids: &[i64]) -> Result<Adventure> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_adventure_sqlite(self.pool.sqlite()?, adventure, tag_ids).await
            }
            DatabaseDriver::Mysql => {
                create_adventure_mysql(self.pool.mysql()?, adventure, tag_ids).await
            }
        }
    }

    async fn update(&self, adventure: &Adventure, tag_ids: Option<&[i64]>) -> Result<Adventure> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_adventure_sqlite(self.pool.sqlite()?, adventure, tag_ids).await
            }
            DatabaseDriver::Mysql => {
                update_adventure_mysql(self.pool.mysql()?, adventure, tag_ids).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_adventure_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_adventure_mysql(self.pool.mysql()?, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_adventures_sqlite(
    pool: &SqlitePool,
    params: ListParams,
    status: Option<AdventureStatus>,
) -> Result<Vec<Adventure>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {} FROM adventures WHERE status = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                ADVENTURE_COLUMNS
            );
            sqlx::query(&sql)
                .bind(status.as_str())
                .bind(params.limit)
                .bind(params.skip)
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!(
                "SELECT {} FROM adventures ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                ADVENTURE_COLUMNS
            );
            sqlx::query(&sql)
                .bind(params.limit)
                .bind(params.skip)
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to list adventures")?;

    let mut adventures = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut adventure = row_to_adventure_sqlite(row)?;
        adventure.tags = get_tags_by_adventure_sqlite(pool, adventure.id).await?;
        adventures.push(adventure);
    }
    Ok(adventures)
}

async fn get_adventure_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Adventure>> {
    let sql = format!("SELECT {} FROM adventures WHERE id = ?", ADVENTURE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get adventure by ID")?;

    match row {
        Some(row) => {
            let mut adventure = row_to_adventure_sqlite(&row)?;
            adventure.tags = get_tags_by_adventure_sqlite(pool, adventure.id).await?;
            Ok(Some(adventure))
        }
        None => Ok(None),
    }
}

async fn get_adventure_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Adventure>> {
    let sql = format!("SELECT {} FROM adventures WHERE slug = ?", ADVENTURE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get adventure by slug")?;

    match row {
        Some(row) => {
            let mut adventure = row_to_adventure_sqlite(&row)?;
            adventure.tags = get_tags_by_adventure_sqlite(pool, adventure.id).await?;
            Ok(Some(adventure))
        }
        None => Ok(None),
    }
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM adventures WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id.unwrap_or(0))
        .fetch_one(pool)
        .await
        .context("Failed to check slug existence")?;

    Ok(count > 0)
}

async fn create_adventure_sqlite(pool: &SqlitePool, adventure: &Adventure, tag_ids: &[i64]) -> Result<Adventure> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO adventures (
            title, slug, description, content, status, location, start_date, end_date,
            duration_days, distance_km, elevation_m, difficulty, surface, gpx_file_path,
            start_coordinates, equipment_notes, tips, cover_image, user_id, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&adventure.title)
    .bind(&adventure.slug)
    .bind(&adventure.description)
    .bind(&adventure.content)
    .bind(adventure.status.as_str())
    .bind(&adventure.location)
    .bind(adventure.start_date)
    .bind(adventure.end_date)
    .bind(adventure.duration_days)
    .bind(adventure.distance_km)
    .bind(adventure.elevation_m)
    .bind(&adventure.difficulty)
    .bind(&adventure.surface)
    .bind(&adventure.gpx_file_path)
    .bind(&adventure.start_coordinates)
    .bind(&adventure.equipment_notes)
    .bind(&adventure.tips)
    .bind(&adventure.cover_image)
    .bind(adventure.user_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create adventure")?;

    let id = result.last_insert_rowid();
    insert_adventure_tags_sqlite(&mut tx, id, tag_ids).await?;
    tx.commit().await.context("Failed to commit adventure")?;

    get_adventure_by_id_sqlite(pool, id)
        .await?
        .context("Adventure not found after insert")
}

async fn update_adventure_sqlite(
    pool: &SqlitePool,
    adventure: &Adventure,
    tag_ids: Option<&[i64]>,
) -> Result<Adventure> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE adventures SET
            title = ?, slug = ?, description = ?, content = ?, status = ?, location = ?,
            start_date = ?, end_date = ?, duration_days = ?, distance_km = ?, elevation_m = ?,
            difficulty = ?, surface = ?, gpx_file_path = ?, start_coordinates = ?,
            equipment_notes = ?, tips = ?, cover_image = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&adventure.title)
    .bind(&adventure.slug)
    .bind(&adventure.description)
    .bind(&adventure.content)
    .bind(adventure.status.as_str())
    .bind(&adventure.location)
    .bind(adventure.start_date)
    .bind(adventure.end_date)
    .bind(adventure.duration_days)
    .bind(adventure.distance_km)
    .bind(adventure.elevation_m)
    .bind(&adventure.difficulty)
    .bind(&adventure.surface)
    .bind(&adventure.gpx_file_path)
    .bind(&adventure.start_coordinates)
    .bind(&adventure.equipment_notes)
    .bind(&adventure.tips)
    .bind(&adventure.cover_image)
    .bind(Utc::now())
    .bind(adventure.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update adventure")?;

    if let Some(tag_ids) = tag_ids {
        replace_adventure_tags_sqlite(&mut tx, adventure.id, tag_ids).await?;
    }
    tx.commit().await.context("Failed to commit adventure update")?;

    get_adventure_by_id_sqlite(pool, adventure.id)
        .await?
        .context("Adventure not found after update")
}

async fn delete_adventure_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM adventures WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete adventure")?;

    Ok(result.rows_affected() > 0)
}

async fn replace_adventure_tags_sqlite(
    conn: &mut SqliteConnection,
    adventure_id: i64,
    tag_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM adventure_tags WHERE adventure_id = ?")
        .bind(adventure_id)
        .execute(&mut *conn)
        .await
        .context("Failed to clear adventure tags")?;

    insert_adventure_tags_sqlite(conn, adventure_id, tag_ids).await
}

async fn insert_adventure_tags_sqlite(
    conn: &mut SqliteConnection,
    adventure_id: i64,
    tag_ids: &[i64],
) -> Result<()> {
    for &tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO adventure_tags (adventure_id, tag_id) VALUES (?, ?)")
            .bind(adventure_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await
            .context("Failed to attach tag to adventure")?;
    }
    Ok(())
}

fn row_to_adventure_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Adventure> {
    let status_str: String = row.try_get("status")?;
    let status = AdventureStatus::from_str(&status_str)
        .with_context(|| format!("Invalid adventure status in database: {}", status_str))?;

    Ok(Adventure {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        status,
        location: row.try_get("location")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        duration_days: row.try_get("duration_days")?,
        distance_km: row.try_get("distance_km")?,
        elevation_m: row.try_get("elevation_m")?,
        difficulty: row.try_get("difficulty")?,
        surface: row.try_get("surface")?,
        gpx_file_path: row.try_get("gpx_file_path")?,
        start_coordinates: row.try_get("start_coordinates")?,
        equipment_notes: row.try_get("equipment_notes")?,
        tips: row.try_get("tips")?,
        cover_image: row.try_get("cover_image")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        tags: Vec::new(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_adventures_mysql(
    pool: &MySqlPool,
    params: ListParams,
    status: Option<AdventureStatus>,
) -> Result<Vec<Adventure>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {} FROM adventures WHERE status = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                ADVENTURE_COLUMNS
            );
            sqlx::query(&sql)
                .bind(status.as_str())
                .bind(params.limit)
                .bind(params.skip)
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!(
                "SELECT {} FROM adventures ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                ADVENTURE_COLUMNS
            );
            sqlx::query(&sql)
                .bind(params.limit)
                .bind(params.skip)
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to list adventures")?;

    let mut adventures = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut adventure = row_to_adventure_mysql(row)?;
        adventure.tags = get_tags_by_adventure_mysql(pool, adventure.id).await?;
        adventures.push(adventure);
    }
    Ok(adventures)
}

async fn get_adventure_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Adventure>> {
    let sql = format!("SELECT {} FROM adventures WHERE id = ?", ADVENTURE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get adventure by ID")?;

    match row {
        Some(row) => {
            let mut adventure = row_to_adventure_mysql(&row)?;
            adventure.tags = get_tags_by_adventure_mysql(pool, adventure.id).await?;
            Ok(Some(adventure))
        }
        None => Ok(None),
    }
}

async fn get_adventure_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Adventure>> {
    let sql = format!("SELECT {} FROM adventures WHERE slug = ?", ADVENTURE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get adventure by slug")?;

    match row {
        Some(row) => {
            let mut adventure = row_to_adventure_mysql(&row)?;
            adventure.tags = get_tags_by_adventure_mysql(pool, adventure.id).await?;
            Ok(Some(adventure))
        }
        None => Ok(None),
    }
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM adventures WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id.unwrap_or(0))
        .fetch_one(pool)
        .await
        .context("Failed to check slug existence")?;

    Ok(count > 0)
}

async fn create_adventure_mysql(pool: &MySqlPool, adventure: &Adventure, tag_ids: &[i64]) -> Result<Adventure> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO adventures (
            title, slug, description, content, status, location, start_date, end_date,
            duration_days, distance_km, elevation_m, difficulty, surface, gpx_file_path,
            start_coordinates, equipment_notes, tips, cover_image, user_id, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&adventure.title)
    .bind(&adventure.slug)
    .bind(&adventure.description)
    .bind(&adventure.content)
    .bind(adventure.status.as_str())
    .bind(&adventure.location)
    .bind(adventure.start_date)
    .bind(adventure.end_date)
    .bind(adventure.duration_days)
    .bind(adventure.distance_km)
    .bind(adventure.elevation_m)
    .bind(&adventure.difficulty)
    .bind(&adventure.surface)
    .bind(&adventure.gpx_file_path)
    .bind(&adventure.start_coordinates)
    .bind(&adventure.equipment_notes)
    .bind(&adventure.tips)
    .bind(&adventure.cover_image)
    .bind(adventure.user_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create adventure")?;

    let id = result.last_insert_id() as i64;
    insert_adventure_tags_mysql(&mut tx, id, tag_ids).await?;
    tx.commit().await.context("Failed to commit adventure")?;

    get_adventure_by_id_mysql(pool, id)
        .await?
        .context("Adventure not found after insert")
}

async fn update_adventure_mysql(
    pool: &MySqlPool,
    adventure: &Adventure,
    tag_ids: Option<&[i64]>,
) -> Result<Adventure> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE adventures SET
            title = ?, slug = ?, description = ?, content = ?, status = ?, location = ?,
            start_date = ?, end_date = ?, duration_days = ?, distance_km = ?, elevation_m = ?,
            difficulty = ?, surface = ?, gpx_file_path = ?, start_coordinates = ?,
            equipment_notes = ?, tips = ?, cover_image = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&adventure.title)
    .bind(&adventure.slug)
    .bind(&adventure.description)
    .bind(&adventure.content)
    .bind(adventure.status.as_str())
    .bind(&adventure.location)
    .bind(adventure.start_date)
    .bind(adventure.end_date)
    .bind(adventure.duration_days)
    .bind(adventure.distance_km)
    .bind(adventure.elevation_m)
    .bind(&adventure.difficulty)
    .bind(&adventure.surface)
    .bind(&adventure.gpx_file_path)
    .bind(&adventure.start_coordinates)
    .bind(&adventure.equipment_notes)
    .bind(&adventure.tips)
    .bind(&adventure.cover_image)
    .bind(Utc::now())
    .bind(adventure.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update adventure")?;

    if let Some(tag_ids) = tag_ids {
        replace_adventure_tags_mysql(&mut tx, adventure.id, tag_ids).await?;
    }
    tx.commit().await.context("Failed to commit adventure update")?;

    get_adventure_by_id_mysql(pool, adventure.id)
        .await?
        .context("Adventure not found after update")
}

async fn delete_adventure_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM adventures WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete adventure")?;

    Ok(result.rows_affected() > 0)
}

async fn replace_adventure_tags_mysql(
    conn: &mut MySqlConnection,
    adventure_id: i64,
    tag_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM adventure_tags WHERE adventure_id = ?")
        .bind(adventure_id)
        .execute(&mut *conn)
        .await
        .context("Failed to clear adventure tags")?;

    insert_adventure_tags_mysql(conn, adventure_id, tag_ids).await
}

async fn insert_adventure_tags_mysql(
    conn: &mut MySqlConnection,
    adventure_id: i64,
    tag_ids: &[i64],
) -> Result<()> {
    for &tag_id in tag_ids {
        sqlx::query("INSERT IGNORE INTO adventure_tags (adventure_id, tag_id) VALUES (?, ?)")
            .bind(adventure_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await
            .context("Failed to attach tag to adventure")?;
    }
    Ok(())
}

fn row_to_adventure_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Adventure> {
    let status_str: String = row.try_get("status")?;
    let status = AdventureStatus::from_str(&status_str)
        .with_context(|| format!("Invalid adventure status in database: {}", status_str))?;

    Ok(Adventure {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        status,
        location: row.try_get("location")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        duration_days: row.try_get("duration_days")?,
        distance_km: row.try_get("distance_km")?,
        elevation_m: row.try_get("elevation_m")?,
        difficulty: row.try_get("difficulty")?,
        surface: row.try_get("surface")?,
        gpx_file_path: row.try_get("gpx_file_path")?,
        start_coordinates: row.try_get("start_coordinates")?,
        equipment_notes: row.try_get("equipment_notes")?,
        tips: row.try_get("tips")?,
        cover_image: row.try_get("cover_image")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        tags: Vec::new(),
    })
}

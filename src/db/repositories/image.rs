//! Image repository
//!
//! Database operations for uploaded images.
//!
//! Marking an image as cover demotes every other image of the same
//! adventure and/or equipment item inside the same transaction as the
//! write, so readers never observe two covers for one parent.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateImageInput, Image, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

const IMAGE_COLUMNS: &str =
    "id, file_path, title, description, is_cover, adventure_id, equipment_id, created_at";

/// Which parent an image list is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageParent {
    Adventure(i64),
    Equipment(i64),
}

impl ImageParent {
    fn column(&self) -> &'static str {
        match self {
            ImageParent::Adventure(_) => "adventure_id",
            ImageParent::Equipment(_) => "equipment_id",
        }
    }

    fn id(&self) -> i64 {
        match self {
            ImageParent::Adventure(id) | ImageParent::Equipment(id) => *id,
        }
    }
}

/// Image repository trait
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert an image, demoting other covers of its parents when `is_cover` is set
    async fn create(&self, input: &CreateImageInput) -> Result<Image>;

    /// Get image by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Image>>;

    /// List all images ordered by ID
    async fn list(&self, params: ListParams) -> Result<Vec<Image>>;

    /// List the images of one parent, cover first
    async fn list_by_parent(&self, parent: ImageParent) -> Result<Vec<Image>>;

    /// Persist title, description and cover flag of `image`.
    ///
    /// With `demote_others`, every other image sharing a parent with `image`
    /// loses its cover flag in the same transaction.
    async fn update(&self, image: &Image, demote_others: bool) -> Result<Image>;

    /// Delete an image row. Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based image repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxImageRepository {
    pool: DynDatabasePool,
}

impl SqlxImageRepository {
    /// Create a new SQLx image repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ImageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ImageRepository for SqlxImageRepository {
    async fn create(&self, input: &CreateImageInput) -> Result<Image> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_image_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_image_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Image>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_image_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_image_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self, params: ListParams) -> Result<Vec<Image>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_images_sqlite(self.pool.sqlite()?, params).await,
            DatabaseDriver::Mysql => list_images_mysql(self.pool.mysql()?, params).await,
        }
    }

    async fn list_by_parent(&self, parent: ImageParent) -> Result<Vec<Image>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_images_by_parent_sqlite(self.pool.sqlite()?, parent).await,
            DatabaseDriver::Mysql => list_images_by_parent_mysql(self.pool.mysql()?, parent).await,
        }
    }

    async fn update(&self, image: &Image, demote_others: bool) -> Result<Image> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_image_sqlite(self.pool.sqlite()?, image, demote_others).await
            }
            DatabaseDriver::Mysql => {
                update_image_mysql(self.pool.mysql()?, image, demote_others).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_image_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_image_mysql(self.pool.mysql()?, id).await,
        }
    }
}

/// Parents whose other images must lose the cover flag
fn cover_parents(adventure_id: Option<i64>, equipment_id: Option<i64>) -> Vec<ImageParent> {
    adventure_id
        .map(ImageParent::Adventure)
        .into_iter()
        .chain(equipment_id.map(ImageParent::Equipment))
        .collect()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_image_sqlite(pool: &SqlitePool, input: &CreateImageInput) -> Result<Image> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    if input.is_cover {
        for parent in cover_parents(input.adventure_id, input.equipment_id) {
            demote_covers_sqlite(&mut tx, parent, None).await?;
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO images (file_path, title, description, is_cover, adventure_id, equipment_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.file_path)
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.is_cover)
    .bind(input.adventure_id)
    .bind(input.equipment_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create image")?;

    tx.commit().await.context("Failed to commit image")?;

    Ok(Image {
        id: result.last_insert_rowid(),
        file_path: input.file_path.clone(),
        title: input.title.clone(),
        description: input.description.clone(),
        is_cover: input.is_cover,
        adventure_id: input.adventure_id,
        equipment_id: input.equipment_id,
        created_at: now,
    })
}

async fn get_image_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Image>> {
    let sql = format!("SELECT {} FROM images WHERE id = ?", IMAGE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get image by ID")?;

    row.as_ref().map(row_to_image_sqlite).transpose()
}

async fn list_images_sqlite(pool: &SqlitePool, params: ListParams) -> Result<Vec<Image>> {
    let sql = format!("SELECT {} FROM images ORDER BY id ASC LIMIT ? OFFSET ?", IMAGE_COLUMNS);
    let rows = sqlx::query(&sql)
        .bind(params.limit)
        .bind(params.skip)
        .fetch_all(pool)
        .await
        .context("Failed to list images")?;

    rows.iter().map(row_to_image_sqlite).collect()
}

async fn list_images_by_parent_sqlite(pool: &SqlitePool, parent: ImageParent) -> Result<Vec<Image>> {
    let sql = format!(
        "SELECT {} FROM images WHERE {} = ? ORDER BY is_cover DESC, id ASC",
        IMAGE_COLUMNS,
        parent.column()
    );
    let rows = sqlx::query(&sql)
        .bind(parent.id())
        .fetch_all(pool)
        .await
        .context("Failed to list images for parent")?;

    rows.iter().map(row_to_image_sqlite).collect()
}

async fn update_image_sqlite(pool: &SqlitePool, image: &Image, demote_others: bool) -> Result<Image> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    if demote_others {
        for parent in cover_parents(image.adventure_id, image.equipment_id) {
            demote_covers_sqlite(&mut tx, parent, Some(image.id)).await?;
        }
    }

    sqlx::query("UPDATE images SET title = ?, description = ?, is_cover = ? WHERE id = ?")
        .bind(&image.title)
        .bind(&image.description)
        .bind(image.is_cover)
        .bind(image.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update image")?;

    tx.commit().await.context("Failed to commit image update")?;

    get_image_by_id_sqlite(pool, image.id)
        .await?
        .context("Image not found after update")
}

async fn demote_covers_sqlite(
    conn: &mut SqliteConnection,
    parent: ImageParent,
    except_id: Option<i64>,
) -> Result<()> {
    let sql = format!(
        "UPDATE images SET is_cover = ? WHERE {} = ? AND id != ? AND is_cover = ?",
        parent.column()
    );
    let result = sqlx::query(&sql)
        .bind(false)
        .bind(parent.id())
        .bind(except_id.unwrap_or(0))
        .bind(true)
        .execute(&mut *conn)
        .await
        .context("Failed to demote cover images")?;

    if result.rows_affected() > 0 {
        tracing::debug!("Demoted {} cover image(s) of {:?}", result.rows_affected(), parent);
    }
    Ok(())
}

async fn delete_image_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM images WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete image")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_image_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Image> {
    Ok(Image {
        id: row.try_get("id")?,
        file_path: row.try_get("file_path")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        is_cover: row.try_get("is_cover")?,
        adventure_id: row.try_get("adventure_id")?,
        equipment_id: row.try_get("equipment_id")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_image_mysql(pool: &MySqlPool, input: &CreateImageInput) -> Result<Image> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    if input.is_cover {
        for parent in cover_parents(input.adventure_id, input.equipment_id) {
            demote_covers_mysql(&mut tx, parent, None).await?;
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO images (file_path, title, description, is_cover, adventure_id, equipment_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.file_path)
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.is_cover)
    .bind(input.adventure_id)
    .bind(input.equipment_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create image")?;

    tx.commit().await.context("Failed to commit image")?;

    Ok(Image {
        id: result.last_insert_id() as i64,
        file_path: input.file_path.clone(),
        title: input.title.clone(),
        description: input.description.clone(),
        is_cover: input.is_cover,
        adventure_id: input.adventure_id,
        equipment_id: input.equipment_id,
        created_at: now,
    })
}

async fn get_image_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Image>> {
    let sql = format!("SELECT {} FROM images WHERE id = ?", IMAGE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get image by ID")?;

    row.as_ref().map(row_to_image_mysql).transpose()
}

async fn list_images_mysql(pool: &MySqlPool, params: ListParams) -> Result<Vec<Image>> {
    let sql = format!("SELECT {} FROM images ORDER BY id ASC LIMIT ? OFFSET ?", IMAGE_COLUMNS);
    let rows = sqlx::query(&sql)
        .bind(params.limit)
        .bind(params.skip)
        .fetch_all(pool)
        .await
        .context("Failed to list images")?;

    rows.iter().map(row_to_image_mysql).collect()
}

async fn list_images_by_parent_mysql(pool: &MySqlPool, parent: ImageParent) -> Result<Vec<Image>> {
    let sql = format!(
        "SELECT {} FROM images WHERE {} = ? ORDER BY is_cover DESC, id ASC",
        IMAGE_COLUMNS,
        parent.column()
    );
    let rows = sqlx::query(&sql)
        .bind(parent.id())
        .fetch_all(pool)
        .await
        .context("Failed to list images for parent")?;

    rows.iter().map(row_to_image_mysql).collect()
}

async fn update_image_mysql(pool: &MySqlPool, image: &Image, demote_others: bool) -> Result<Image> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    if demote_others {
        for parent in cover_parents(image.adventure_id, image.equipment_id) {
            demote_covers_mysql(&mut tx, parent, Some(image.id)).await?;
        }
    }

    sqlx::query("UPDATE images SET title = ?, description = ?, is_cover = ? WHERE id = ?")
        .bind(&image.title)
        .bind(&image.description)
        .bind(image.is_cover)
        .bind(image.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update image")?;

    tx.commit().await.context("Failed to commit image update")?;

    get_image_by_id_mysql(pool, image.id)
        .await?
        .context("Image not found after update")
}

async fn demote_covers_mysql(
    conn: &mut MySqlConnection,
    parent: ImageParent,
    except_id: Option<i64>,
) -> Result<()> {
    let sql = format!(
        "UPDATE images SET is_cover = ? WHERE {} = ? AND id != ? AND is_cover = ?",
        parent.column()
    );
    let result = sqlx::query(&sql)
        .bind(false)
        .bind(parent.id())
        .bind(except_id.unwrap_or(0))
        .bind(true)
        .execute(&mut *conn)
        .await
        .context("Failed to demote cover images")?;

    if result.rows_affected() > 0 {
        tracing::debug!("Demoted {} cover image(s) of {:?}", result.rows_affected(), parent);
    }
    Ok(())
}

async fn delete_image_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM images WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete image")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_image_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Image> {
    Ok(Image {
        id: row.try_get("id")?,
        file_path: row.try_get("file_path")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        is_cover: row.try_get("is_cover")?,
        adventure_id: row.try_get("adventure_id")?,
        equipment_id: row.try_get("equipment_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxImageRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxImageRepository::new(pool.clone());
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

    async fn create_test_equipment(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query("INSERT INTO equipment (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .expect("Failed to create test equipment")
            .last_insert_rowid()
    }

    async fn covers_of(repo: &SqlxImageRepository, parent: ImageParent) -> Vec<i64> {
        repo.list_by_parent(parent)
            .await
            .unwrap()
            .into_iter()
            .filter(|i| i.is_cover)
            .map(|i| i.id)
            .collect()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (pool, repo) = setup_test_repo().await;
        let adventure_id = create_test_adventure(pool.sqlite().unwrap(), "alb").await;

        let mut input = CreateImageInput::new("2025/05/a.jpg").for_adventure(adventure_id);
        input.title = Some("Sunrise".to_string());
        let created = repo.create(&input).await.expect("Failed to create image");

        assert!(created.id > 0);
        let found = repo.get_by_id(created.id).await.unwrap().expect("not found");
        assert_eq!(found.file_path, "2025/05/a.jpg");
        assert_eq!(found.title.as_deref(), Some("Sunrise"));
        assert_eq!(found.adventure_id, Some(adventure_id));
        assert!(!found.is_cover);
        assert!(repo.get_by_id(99999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_cover_demotes_previous_cover_of_same_adventure_only() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.sqlite().unwrap();
        let x = create_test_adventure(sqlite, "x").await;
        let y = create_test_adventure(sqlite, "y").await;

        let x_first = repo.create(&CreateImageInput::new("x1.jpg").for_adventure(x).as_cover()).await.unwrap();
        let y_cover = repo.create(&CreateImageInput::new("y1.jpg").for_adventure(y).as_cover()).await.unwrap();
        let x_second = repo.create(&CreateImageInput::new("x2.jpg").for_adventure(x).as_cover()).await.unwrap();

        assert_eq!(covers_of(&repo, ImageParent::Adventure(x)).await, vec![x_second.id]);
        assert_eq!(covers_of(&repo, ImageParent::Adventure(y)).await, vec![y_cover.id]);
        assert!(!repo.get_by_id(x_first.id).await.unwrap().unwrap().is_cover);
    }

    #[tokio::test]
    async fn test_cover_for_both_parents() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.sqlite().unwrap();
        let adventure = create_test_adventure(sqlite, "x").await;
        let equipment = create_test_equipment(sqlite, "Tent").await;

        repo.create(&CreateImageInput::new("a.jpg").for_adventure(adventure).as_cover()).await.unwrap();
        repo.create(&CreateImageInput::new("e.jpg").for_equipment(equipment).as_cover()).await.unwrap();
        let both = repo
            .create(&CreateImageInput::new("b.jpg").for_adventure(adventure).for_equipment(equipment).as_cover())
            .await
            .unwrap();

        assert_eq!(covers_of(&repo, ImageParent::Adventure(adventure)).await, vec![both.id]);
        assert_eq!(covers_of(&repo, ImageParent::Equipment(equipment)).await, vec![both.id]);
    }

    #[tokio::test]
    async fn test_update_with_demotion_excludes_self() {
        let (pool, repo) = setup_test_repo().await;
        let adventure = create_test_adventure(pool.sqlite().unwrap(), "x").await;
        let old_cover = repo.create(&CreateImageInput::new("1.jpg").for_adventure(adventure).as_cover()).await.unwrap();
        let mut image = repo.create(&CreateImageInput::new("2.jpg").for_adventure(adventure)).await.unwrap();

        image.is_cover = true;
        image.title = Some("New cover".to_string());
        let updated = repo.update(&image, true).await.unwrap();

        assert!(updated.is_cover);
        assert_eq!(updated.title.as_deref(), Some("New cover"));
        assert!(!repo.get_by_id(old_cover.id).await.unwrap().unwrap().is_cover);
    }

    #[tokio::test]
    async fn test_list_by_parent_puts_cover_first() {
        let (pool, repo) = setup_test_repo().await;
        let adventure = create_test_adventure(pool.sqlite().unwrap(), "x").await;
        let first = repo.create(&CreateImageInput::new("1.jpg").for_adventure(adventure)).await.unwrap();
        let cover = repo.create(&CreateImageInput::new("2.jpg").for_adventure(adventure).as_cover()).await.unwrap();
        let third = repo.create(&CreateImageInput::new("3.jpg").for_adventure(adventure)).await.unwrap();
        repo.create(&CreateImageInput::new("loose.jpg")).await.unwrap();

        let ids: Vec<i64> = repo
            .list_by_parent(ImageParent::Adventure(adventure))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();

        assert_eq!(ids, vec![cover.id, first.id, third.id]);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (_pool, repo) = setup_test_repo().await;
        for n in 0..3 {
            repo.create(&CreateImageInput::new(format!("{}.jpg", n))).await.unwrap();
        }

        let page = repo.list(ListParams::new(1, 5)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].file_path, "1.jpg");

        assert!(repo.delete(page[0].id).await.unwrap());
        assert!(!repo.delete(page[0].id).await.unwrap());
        assert_eq!(repo.list(ListParams::new(0, 20)).await.unwrap().len(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Whatever sequence of cover uploads happens, each adventure ends
        /// with at most one cover, and it is the last cover uploaded to it.
        #[test]
        fn property_at_most_one_cover_per_adventure(uploads in prop::collection::vec((0usize..3, any::<bool>()), 1..15)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (pool, repo) = setup_test_repo().await;
                let sqlite = pool.sqlite().unwrap();
                let mut adventures = Vec::new();
                for n in 0..3 {
                    adventures.push(create_test_adventure(sqlite, &format!("adv-{}", n)).await);
                }

                let mut expected: Vec<Option<i64>> = vec![None; 3];
                for (idx, is_cover) in uploads {
                    let mut input = CreateImageInput::new("p.jpg").for_adventure(adventures[idx]);
                    input.is_cover = is_cover;
                    let image = repo.create(&input).await.unwrap();
                    if is_cover {
                        expected[idx] = Some(image.id);
                    }
                }

                for (idx, adventure) in adventures.iter().enumerate() {
                    let covers = covers_of(&repo, ImageParent::Adventure(*adventure)).await;
                    prop_assert_eq!(covers, expected[idx].into_iter().collect::<Vec<_>>());
                }
                Ok(())
            })?;
        }
    }
}

//! Equipment repository
//!
//! Database operations for gear items.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Equipment, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const EQUIPMENT_COLUMNS: &str = "id, name, description, category, weight_g, price, purchase_link, \
    notes, created_at, updated_at";

/// Equipment repository trait
#[async_trait]
pub trait EquipmentRepository: Send + Sync {
    /// Create a new equipment item
    async fn create(&self, equipment: &Equipment) -> Result<Equipment>;

    /// Get equipment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Equipment>>;

    /// Check whether an equipment item exists
    async fn exists(&self, id: i64) -> Result<bool>;

    /// List equipment ordered by name
    async fn list(&self, params: ListParams) -> Result<Vec<Equipment>>;

    /// Persist every column of `equipment`
    async fn update(&self, equipment: &Equipment) -> Result<Equipment>;

    /// Delete an equipment item. Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based equipment repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxEquipmentRepository {
    pool: DynDatabasePool,
}

impl SqlxEquipmentRepository {
    /// Create a new SQLx equipment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EquipmentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EquipmentRepository for SqlxEquipmentRepository {
    async fn create(&self, equipment: &Equipment) -> Result<Equipment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_equipment_sqlite(self.pool.sqlite()?, equipment).await,
            DatabaseDriver::Mysql => create_equipment_mysql(self.pool.mysql()?, equipment).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Equipment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_equipment_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_equipment_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar("SELECT COUNT(*) FROM equipment WHERE id = ?")
                    .bind(id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar("SELECT COUNT(*) FROM equipment WHERE id = ?")
                    .bind(id)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to check equipment existence")?;

        Ok(count > 0)
    }

    async fn list(&self, params: ListParams) -> Result<Vec<Equipment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_equipment_sqlite(self.pool.sqlite()?, params).await,
            DatabaseDriver::Mysql => list_equipment_mysql(self.pool.mysql()?, params).await,
        }
    }

    async fn update(&self, equipment: &Equipment) -> Result<Equipment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_equipment_sqlite(self.pool.sqlite()?, equipment).await,
            DatabaseDriver::Mysql => update_equipment_mysql(self.pool.mysql()?, equipment).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM equipment WHERE id = ?")
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM equipment WHERE id = ?")
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete equipment")?;

        Ok(result > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_equipment_sqlite(pool: &SqlitePool, equipment: &Equipment) -> Result<Equipment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO equipment (name, description, category, weight_g, price, purchase_link, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&equipment.name)
    .bind(&equipment.description)
    .bind(&equipment.category)
    .bind(equipment.weight_g)
    .bind(equipment.price)
    .bind(&equipment.purchase_link)
    .bind(&equipment.notes)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create equipment")?;

    Ok(Equipment {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..equipment.clone()
    })
}

async fn get_equipment_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Equipment>> {
    let sql = format!("SELECT {} FROM equipment WHERE id = ?", EQUIPMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get equipment by ID")?;

    row.as_ref().map(row_to_equipment_sqlite).transpose()
}

async fn list_equipment_sqlite(pool: &SqlitePool, params: ListParams) -> Result<Vec<Equipment>> {
    let sql = format!(
        "SELECT {} FROM equipment ORDER BY name ASC, id ASC LIMIT ? OFFSET ?",
        EQUIPMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(params.limit)
        .bind(params.skip)
        .fetch_all(pool)
        .await
        .context("Failed to list equipment")?;

    rows.iter().map(row_to_equipment_sqlite).collect()
}

async fn update_equipment_sqlite(pool: &SqlitePool, equipment: &Equipment) -> Result<Equipment> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE equipment
        SET name = ?, description = ?, category = ?, weight_g = ?, price = ?,
            purchase_link = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&equipment.name)
    .bind(&equipment.description)
    .bind(&equipment.category)
    .bind(equipment.weight_g)
    .bind(equipment.price)
    .bind(&equipment.purchase_link)
    .bind(&equipment.notes)
    .bind(now)
    .bind(equipment.id)
    .execute(pool)
    .await
    .context("Failed to update equipment")?;

    Ok(Equipment {
        updated_at: now,
        ..equipment.clone()
    })
}

fn row_to_equipment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Equipment> {
    Ok(Equipment {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        weight_g: row.try_get("weight_g")?,
        price: row.try_get("price")?,
        purchase_link: row.try_get("purchase_link")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_equipment_mysql(pool: &MySqlPool, equipment: &Equipment) -> Result<Equipment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO equipment (name, description, category, weight_g, price, purchase_link, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&equipment.name)
    .bind(&equipment.description)
    .bind(&equipment.category)
    .bind(equipment.weight_g)
    .bind(equipment.price)
    .bind(&equipment.purchase_link)
    .bind(&equipment.notes)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create equipment")?;

    Ok(Equipment {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..equipment.clone()
    })
}

async fn get_equipment_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Equipment>> {
    let sql = format!("SELECT {} FROM equipment WHERE id = ?", EQUIPMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get equipment by ID")?;

    row.as_ref().map(row_to_equipment_mysql).transpose()
}

async fn list_equipment_mysql(pool: &MySqlPool, params: ListParams) -> Result<Vec<Equipment>> {
    let sql = format!(
        "SELECT {} FROM equipment ORDER BY name ASC, id ASC LIMIT ? OFFSET ?",
        EQUIPMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(params.limit)
        .bind(params.skip)
        .fetch_all(pool)
        .await
        .context("Failed to list equipment")?;

    rows.iter().map(row_to_equipment_mysql).collect()
}

async fn update_equipment_mysql(pool: &MySqlPool, equipment: &Equipment) -> Result<Equipment> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE equipment
        SET name = ?, description = ?, category = ?, weight_g = ?, price = ?,
            purchase_link = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&equipment.name)
    .bind(&equipment.description)
    .bind(&equipment.category)
    .bind(equipment.weight_g)
    .bind(equipment.price)
    .bind(&equipment.purchase_link)
    .bind(&equipment.notes)
    .bind(now)
    .bind(equipment.id)
    .execute(pool)
    .await
    .context("Failed to update equipment")?;

    Ok(Equipment {
        updated_at: now,
        ..equipment.clone()
    })
}

fn row_to_equipment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Equipment> {
    Ok(Equipment {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        weight_g: row.try_get("weight_g")?,
        price: row.try_get("price")?,
        purchase_link: row.try_get("purchase_link")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxEquipmentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxEquipmentRepository::new(pool)
    }

    fn test_equipment(name: &str) -> Equipment {
        let now = Utc::now();
        Equipment {
            id: 0,
            name: name.to_string(),
            description: None,
            category: Some("bags".to_string()),
            weight_g: Some(420),
            price: Some(89.9),
            purchase_link: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;

        let created = repo.create(&test_equipment("Frame bag")).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().expect("not found");

        assert!(created.id > 0);
        assert_eq!(found.name, "Frame bag");
        assert_eq!(found.weight_g, Some(420));
        assert_eq!(found.price, Some(89.9));
        assert!(repo.exists(created.id).await.unwrap());
        assert!(!repo.exists(99999).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let repo = setup_test_repo().await;
        for name in ["Tent", "Bivy", "Stove"] {
            repo.create(&test_equipment(name)).await.unwrap();
        }

        let names: Vec<String> = repo
            .list(ListParams::new(0, 100))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Bivy", "Stove", "Tent"]);

        let page = repo.list(ListParams::new(1, 1)).await.unwrap();
        assert_eq!(page[0].name, "Stove");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let mut equipment = repo.create(&test_equipment("Stove")).await.unwrap();

        equipment.weight_g = Some(300);
        equipment.notes = Some("Alcohol".to_string());
        repo.update(&equipment).await.unwrap();

        let found = repo.get_by_id(equipment.id).await.unwrap().unwrap();
        assert_eq!(found.weight_g, Some(300));
        assert_eq!(found.notes.as_deref(), Some("Alcohol"));

        assert!(repo.delete(equipment.id).await.unwrap());
        assert!(!repo.delete(equipment.id).await.unwrap());
        assert!(repo.get_by_id(equipment.id).await.unwrap().is_none());
    }
}

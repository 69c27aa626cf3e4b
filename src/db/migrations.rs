//! Database migrations module
//!
//! Migrations are embedded in the binary as SQL strings, one variant per
//! supported driver. Applied versions are recorded in `_migrations`.
//!
//! ```ignore
//! use sattl::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All schema migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255),
                password_hash VARCHAR(255) NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                is_admin BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255),
                password_hash VARCHAR(255) NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                is_admin BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                slug VARCHAR(100) NOT NULL UNIQUE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                slug VARCHAR(100) NOT NULL UNIQUE
            );
        "#,
    },
    Migration {
        version: 3,
        name: "create_adventures",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS adventures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT NOT NULL,
                content TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                location VARCHAR(255),
                start_date DATE,
                end_date DATE,
                duration_days INTEGER,
                distance_km REAL,
                elevation_m INTEGER,
                difficulty VARCHAR(50),
                surface VARCHAR(50),
                gpx_file_path VARCHAR(255),
                start_coordinates VARCHAR(100),
                equipment_notes TEXT,
                tips TEXT,
                cover_image VARCHAR(255),
                user_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_adventures_status ON adventures(status);
            CREATE INDEX IF NOT EXISTS idx_adventures_created_at ON adventures(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS adventures (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT NOT NULL,
                content MEDIUMTEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                location VARCHAR(255),
                start_date DATE,
                end_date DATE,
                duration_days BIGINT,
                distance_km DOUBLE,
                elevation_m BIGINT,
                difficulty VARCHAR(50),
                surface VARCHAR(50),
                gpx_file_path VARCHAR(255),
                start_coordinates VARCHAR(100),
                equipment_notes TEXT,
                tips TEXT,
                cover_image VARCHAR(255),
                user_id BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_adventures_status ON adventures(status);
            CREATE INDEX idx_adventures_created_at ON adventures(created_at);
        "#,
    },
    Migration {
        version: 4,
        name: "create_adventure_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS adventure_tags (
                adventure_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (adventure_id, tag_id),
                FOREIGN KEY (adventure_id) REFERENCES adventures(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_adventure_tags_tag_id ON adventure_tags(tag_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS adventure_tags (
                adventure_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL,
                PRIMARY KEY (adventure_id, tag_id),
                FOREIGN KEY (adventure_id) REFERENCES adventures(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_adventure_tags_tag_id ON adventure_tags(tag_id);
        "#,
    },
    Migration {
        version: 5,
        name: "create_equipment",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS equipment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                category VARCHAR(100),
                weight_g INTEGER,
                price REAL,
                purchase_link VARCHAR(255),
                notes TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS equipment (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                category VARCHAR(100),
                weight_g BIGINT,
                price DOUBLE,
                purchase_link VARCHAR(255),
                notes TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_images",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_path VARCHAR(255) NOT NULL,
                title VARCHAR(255),
                description TEXT,
                is_cover BOOLEAN NOT NULL DEFAULT 0,
                adventure_id INTEGER,
                equipment_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (adventure_id) REFERENCES adventures(id) ON DELETE SET NULL,
                FOREIGN KEY (equipment_id) REFERENCES equipment(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_images_adventure_id ON images(adventure_id);
            CREATE INDEX IF NOT EXISTS idx_images_equipment_id ON images(equipment_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS images (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                file_path VARCHAR(255) NOT NULL,
                title VARCHAR(255),
                description TEXT,
                is_cover BOOLEAN NOT NULL DEFAULT FALSE,
                adventure_id BIGINT,
                equipment_id BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (adventure_id) REFERENCES adventures(id) ON DELETE SET NULL,
                FOREIGN KEY (equipment_id) REFERENCES equipment(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_images_adventure_id ON images(adventure_id);
            CREATE INDEX idx_images_equipment_id ON images(equipment_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_profiles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                nickname VARCHAR(255) NOT NULL,
                bio TEXT,
                location VARCHAR(255),
                website VARCHAR(255),
                avatar_url VARCHAR(255),
                email VARCHAR(255),
                social_links TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL UNIQUE,
                nickname VARCHAR(255) NOT NULL,
                bio TEXT,
                location VARCHAR(255),
                website VARCHAR(255),
                avatar_url VARCHAR(255),
                email VARCHAR(255),
                social_links TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
];

/// Run all pending migrations
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i64> = applied.iter().map(|m| m.version).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if applied_versions.contains(&(migration.version as i64)) {
            continue;
        }
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.sqlite()?).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.mysql()?).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    rows.iter()
        .map(|row| {
            Ok(MigrationRecord {
                version: row.try_get("version")?,
                name: row.try_get("name")?,
                applied_at: row.try_get("applied_at")?,
            })
        })
        .collect()
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    rows.iter()
        .map(|row| {
            Ok(MigrationRecord {
                version: row.try_get("version")?,
                name: row.try_get("name")?,
                applied_at: row.try_get("applied_at")?,
            })
        })
        .collect()
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(pool.sqlite()?, migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(pool.mysql()?, migration).await,
    }
}

// SQLite DDL is transactional, so a failed migration leaves no partial schema behind.
async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin migration")?;

    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .context("Failed to record migration")?;

    tx.commit().await.context("Failed to commit migration")?;
    Ok(())
}

// MySQL commits DDL implicitly; statements run one by one.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to record migration")?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)")
            .bind(username)
            .bind(format!("{}@example.com", username))
            .bind("hash")
            .execute(pool)
            .await
            .expect("Failed to insert user")
            .last_insert_rowid()
    }

    async fn insert_adventure(pool: &SqlitePool, slug: &str) -> i64 {
        sqlx::query("INSERT INTO adventures (title, slug, description, content) VALUES (?, ?, ?, ?)")
            .bind(slug)
            .bind(slug)
            .bind("desc")
            .bind("content")
            .execute(pool)
            .await
            .expect("Failed to insert adventure")
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_user_defaults() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().unwrap();
        let id = insert_user(sqlite, "rider").await;

        let row = sqlx::query("SELECT is_active, is_admin FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert!(row.get::<bool, _>("is_active"));
        assert!(!row.get::<bool, _>("is_admin"));
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().unwrap();

        insert_adventure(sqlite, "albtrauf").await;
        let dup = sqlx::query(
            "INSERT INTO adventures (title, slug, description, content) VALUES ('x', 'albtrauf', 'd', 'c')",
        )
        .execute(sqlite)
        .await;
        assert!(dup.is_err());

        sqlx::query("INSERT INTO tags (name, slug) VALUES ('Gravel', 'gravel')")
            .execute(sqlite)
            .await
            .unwrap();
        let dup_name = sqlx::query("INSERT INTO tags (name, slug) VALUES ('Gravel', 'gravel-2')")
            .execute(sqlite)
            .await;
        assert!(dup_name.is_err());
        let dup_slug = sqlx::query("INSERT INTO tags (name, slug) VALUES ('gravel', 'gravel')")
            .execute(sqlite)
            .await;
        assert!(dup_slug.is_err());
    }

    #[tokio::test]
    async fn test_adventure_delete_cascades_to_tag_links() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().unwrap();

        let adventure_id = insert_adventure(sqlite, "donautal").await;
        let tag_id = sqlx::query("INSERT INTO tags (name, slug) VALUES ('River', 'river')")
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO adventure_tags (adventure_id, tag_id) VALUES (?, ?)")
            .bind(adventure_id)
            .bind(tag_id)
            .execute(sqlite)
            .await
            .unwrap();

        sqlx::query("DELETE FROM adventures WHERE id = ?")
            .bind(adventure_id)
            .execute(sqlite)
            .await
            .unwrap();

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM adventure_tags")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(links, 0);
    }

    #[tokio::test]
    async fn test_adventure_delete_detaches_images() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().unwrap();

        let adventure_id = insert_adventure(sqlite, "lautertal").await;
        let image_id = sqlx::query("INSERT INTO images (file_path, adventure_id) VALUES ('2025/04/a.jpg', ?)")
            .bind(adventure_id)
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();

        sqlx::query("DELETE FROM adventures WHERE id = ?")
            .bind(adventure_id)
            .execute(sqlite)
            .await
            .unwrap();

        let parent: Option<i64> = sqlx::query_scalar("SELECT adventure_id FROM images WHERE id = ?")
            .bind(image_id)
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert!(parent.is_none());
    }

    #[tokio::test]
    async fn test_one_profile_per_user() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().unwrap();
        let user_id = insert_user(sqlite, "schwob").await;

        let first = sqlx::query("INSERT INTO profiles (user_id, nickname) VALUES (?, 'Schwob')")
            .bind(user_id)
            .execute(sqlite)
            .await;
        assert!(first.is_ok());

        let second = sqlx::query("INSERT INTO profiles (user_id, nickname) VALUES (?, 'Again')")
            .bind(user_id)
            .execute(sqlite)
            .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_foreign_key_rejects_unknown_parent() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().unwrap();

        let result = sqlx::query("INSERT INTO images (file_path, equipment_id) VALUES ('x.jpg', 999)")
            .execute(sqlite)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_versions_are_sequential() {
        for (idx, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, idx + 1);
        }
        assert_eq!(MIGRATIONS[0].name, "create_users");
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql), vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]);

        let with_comments = "-- header\nCREATE TABLE a (id INT);\n-- trailing";
        assert_eq!(split_sql_statements(with_comments).len(), 1);

        for migration in MIGRATIONS {
            assert!(!split_sql_statements(migration.up_sqlite).is_empty());
            assert!(!split_sql_statements(migration.up_mysql).is_empty());
        }
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- a comment"));
        assert!(is_comment_only("-- one\n   -- two"));
        assert!(!is_comment_only("-- note\nCREATE TABLE t"));
    }

    #[test]
    fn test_truncate_sql() {
        assert_eq!(truncate_sql("SELECT 1"), "SELECT 1");
        let long = "x".repeat(150);
        assert_eq!(truncate_sql(&long).len(), 103);
    }
}

//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod adventure;
pub mod equipment;
pub mod image;
pub mod profile;
pub mod tag;
pub mod user;

pub use adventure::{AdventureRepository, SqlxAdventureRepository};
pub use equipment::{EquipmentRepository, SqlxEquipmentRepository};
pub use image::{ImageParent, ImageRepository, SqlxImageRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Whether a repository error was caused by a UNIQUE constraint violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    })
}

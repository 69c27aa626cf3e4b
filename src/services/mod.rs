//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They:
//! - Enforce validation rules and uniqueness
//! - Resolve tags and slugs for adventures
//! - Store uploaded media and keep cover flags consistent
//! - Hash passwords and issue bearer tokens

pub mod adventure;
pub mod equipment;
pub mod image;
pub mod jwt;
pub mod media;
pub mod password;
pub mod profile;
pub mod slug;
pub mod tag;
pub mod user;

pub use adventure::{AdventureService, AdventureServiceError};
pub use equipment::{EquipmentService, EquipmentServiceError, DEFAULT_EQUIPMENT_LIMIT};
pub use image::{ImageService, ImageServiceError, ImageUpload, UploadedFile, DEFAULT_IMAGE_LIMIT};
pub use jwt::{Claims, JwtError, JwtService};
pub use media::{MediaStorage, StorageError};
pub use password::{hash_password, verify_password};
pub use profile::{ProfileService, ProfileServiceError};
pub use slug::generate_slug;
pub use tag::{TagService, TagServiceError};
pub use user::{UserService, UserServiceError};

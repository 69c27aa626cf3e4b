//! Data models
//!
//! This module contains all data structures used throughout the backend.
//! Models represent:
//! - Database entities (Adventure, Tag, Image, Equipment, Profile, User)
//! - Create/update input types accepted by the services
//! - Skip/limit pagination

mod adventure;
mod equipment;
mod image;
mod profile;
mod tag;
mod user;

pub use adventure::{Adventure, AdventureStatus, CreateAdventureInput, ListParams, UpdateAdventureInput};
pub use equipment::{CreateEquipmentInput, Equipment, UpdateEquipmentInput};
pub use image::{CreateImageInput, Image, UpdateImageInput};
pub use profile::{CreateProfileInput, Profile, UpdateProfileInput};
pub use tag::{Tag, TagRef};
pub use user::{CreateUserInput, User};

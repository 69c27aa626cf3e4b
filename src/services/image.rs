//! Image service
//!
//! Implements business logic for images:
//! - Upload validation (MIME allowlist, size limit, existing parents)
//! - Storing files through [`MediaStorage`]
//! - Keeping at most one cover image per adventure and per equipment item

use crate::config::MediaConfig;
use crate::db::repositories::{AdventureRepository, EquipmentRepository, ImageParent, ImageRepository};
use crate::models::{CreateImageInput, Image, ListParams, UpdateImageInput};
use crate::services::media::{file_extension, MediaStorage, StorageError};
use anyhow::Context;
use std::sync::Arc;

/// Default page size for the image list
pub const DEFAULT_IMAGE_LIMIT: i64 = 20;

/// Error types for image service operations
#[derive(Debug, thiserror::Error)]
pub enum ImageServiceError {
    /// Image or referenced parent not found
    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A file received from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Everything an upload request carries besides authentication
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file: UploadedFile,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_cover: bool,
    pub adventure_id: Option<i64>,
    pub equipment_id: Option<i64>,
}

pub struct ImageService {
    repo: Arc<dyn ImageRepository>,
    adventure_repo: Arc<dyn AdventureRepository>,
    equipment_repo: Arc<dyn EquipmentRepository>,
    storage: MediaStorage,
    config: MediaConfig,
}

impl ImageService {
    pub fn new(
        repo: Arc<dyn ImageRepository>,
        adventure_repo: Arc<dyn AdventureRepository>,
        equipment_repo: Arc<dyn EquipmentRepository>,
        config: MediaConfig,
    ) -> Self {
        Self {
            repo,
            adventure_repo,
            equipment_repo,
            storage: MediaStorage::new(config.root.clone()),
            config,
        }
    }

    pub async fn list(&self, params: ListParams) -> Result<Vec<Image>, ImageServiceError> {
        Ok(self.repo.list(params).await.context("Failed to list images")?)
    }

    /// Images of an adventure, cover first
    pub async fn list_for_adventure(&self, adventure_id: i64) -> Result<Vec<Image>, ImageServiceError> {
        Ok(self
            .repo
            .list_by_parent(ImageParent::Adventure(adventure_id))
            .await
            .context("Failed to list adventure images")?)
    }

    /// Images of an equipment item, cover first
    pub async fn list_for_equipment(&self, equipment_id: i64) -> Result<Vec<Image>, ImageServiceError> {
        Ok(self
            .repo
            .list_by_parent(ImageParent::Equipment(equipment_id))
            .await
            .context("Failed to list equipment images")?)
    }

    pub async fn get(&self, id: i64) -> Result<Image, ImageServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get image")?
            .ok_or_else(|| not_found(id))
    }

    /// Validate, store and register an uploaded image.
    ///
    /// The row is inserted after the file is written; if the insert fails the
    /// file is removed again.
    pub async fn upload(&self, upload: ImageUpload) -> Result<Image, ImageServiceError> {
        let ImageUpload {
            file,
            title,
            description,
            is_cover,
            adventure_id,
            equipment_id,
        } = upload;

        if !self.config.is_type_allowed(&file.content_type) {
            return Err(ImageServiceError::ValidationError(format!(
                "Invalid file type: {}. Allowed types: {}",
                file.content_type,
                self.config.allowed_types.join(", ")
            )));
        }

        if file.data.len() as u64 > self.config.max_image_size {
            return Err(ImageServiceError::ValidationError(format!(
                "File too large. Maximum size: {} bytes ({} MB)",
                self.config.max_image_size,
                self.config.max_image_size / 1024 / 1024
            )));
        }

        self.ensure_parents_exist(adventure_id, equipment_id).await?;

        let extension = file_extension(
            file.filename.as_deref(),
            self.config.get_extension(&file.content_type),
        );
        let file_path = self.storage.save(&file.data, &extension).await?;

        let input = CreateImageInput {
            file_path: file_path.clone(),
            title: title
                .filter(|t| !t.trim().is_empty())
                .or_else(|| file.filename.clone()),
            description,
            is_cover,
            adventure_id,
            equipment_id,
        };

        match self.repo.create(&input).await {
            Ok(image) => {
                tracing::info!(
                    "Uploaded image {} ({} bytes, cover: {})",
                    image.file_path,
                    file.data.len(),
                    image.is_cover
                );
                Ok(image)
            }
            Err(e) => {
                if let Err(remove_err) = self.storage.remove(&file_path).await {
                    tracing::warn!("Failed to remove orphaned upload {}: {}", file_path, remove_err);
                }
                Err(e.context("Failed to create image").into())
            }
        }
    }

    /// Update title, description or cover flag.
    ///
    /// Promoting an image to cover demotes the other covers of its parents.
    pub async fn update(&self, id: i64, input: UpdateImageInput) -> Result<Image, ImageServiceError> {
        let mut image = self.get(id).await?;
        if !input.has_changes() {
            tracing::debug!("Image {} update without changes", id);
            return Ok(image);
        }

        let promote = input.is_cover == Some(true) && !image.is_cover;

        if let Some(title) = input.title {
            image.title = Some(title);
        }
        if let Some(description) = input.description {
            image.description = Some(description);
        }
        if let Some(is_cover) = input.is_cover {
            image.is_cover = is_cover;
        }

        Ok(self
            .repo
            .update(&image, promote)
            .await
            .context("Failed to update image")?)
    }

    /// Delete the stored file, then the row
    pub async fn delete(&self, id: i64) -> Result<(), ImageServiceError> {
        let image = self.get(id).await?;

        if let Err(e) = self.storage.remove(&image.file_path).await {
            tracing::warn!("Failed to remove media file {}: {}", image.file_path, e);
        }

        if !self.repo.delete(id).await.context("Failed to delete image")? {
            return Err(not_found(id));
        }
        tracing::info!("Deleted image {} ({})", id, image.file_path);
        Ok(())
    }

    async fn ensure_parents_exist(
        &self,
        adventure_id: Option<i64>,
        equipment_id: Option<i64>,
    ) -> Result<(), ImageServiceError> {
        if let Some(id) = adventure_id {
            let found = self
                .adventure_repo
                .get_by_id(id)
                .await
                .context("Failed to check adventure")?;
            if found.is_none() {
                return Err(ImageServiceError::NotFound(format!(
                    "Adventure with ID {} not found",
                    id
                )));
            }
        }

        if let Some(id) = equipment_id {
            if !self
                .equipment_repo
                .exists(id)
                .await
                .context("Failed to check equipment")?
            {
                return Err(ImageServiceError::NotFound(format!(
                    "Equipment with ID {} not found",
                    id
                )));
            }
        }

        Ok(())
    }
}

fn not_found(id: i64) -> ImageServiceError {
    ImageServiceError::NotFound(format!("Image with ID {} not found", id))
}

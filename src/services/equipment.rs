//! Equipment service

use crate::db::repositories::EquipmentRepository;
use crate::models::{CreateEquipmentInput, Equipment, ListParams, UpdateEquipmentInput};
use anyhow::Context;
use std::sync::Arc;

/// Default page size for the equipment list
pub const DEFAULT_EQUIPMENT_LIMIT: i64 = 100;

/// Error types for equipment service operations
#[derive(Debug, thiserror::Error)]
pub enum EquipmentServiceError {
    #[error("Equipment not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct EquipmentService {
    repo: Arc<dyn EquipmentRepository>,
}

impl EquipmentService {
    pub fn new(repo: Arc<dyn EquipmentRepository>) -> Self {
        Self { repo }
    }

    /// List equipment ordered by name
    pub async fn list(&self, params: ListParams) -> Result<Vec<Equipment>, EquipmentServiceError> {
        Ok(self.repo.list(params).await.context("Failed to list equipment")?)
    }

    pub async fn get(&self, id: i64) -> Result<Equipment, EquipmentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get equipment")?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, input: CreateEquipmentInput) -> Result<Equipment, EquipmentServiceError> {
        validate_name(&input.name)?;

        let created = self
            .repo
            .create(&Equipment::from_input(&input))
            .await
            .context("Failed to create equipment")?;

        tracing::info!("Created equipment '{}' (id {})", created.name, created.id);
        Ok(created)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateEquipmentInput,
    ) -> Result<Equipment, EquipmentServiceError> {
        if let Some(name) = &input.name {
            validate_name(name)?;
        }

        let mut equipment = self.get(id).await?;
        input.apply_to(&mut equipment);
        equipment.name = equipment.name.trim().to_string();

        Ok(self
            .repo
            .update(&equipment)
            .await
            .context("Failed to update equipment")?)
    }

    /// Delete an item; its images stay but lose the link
    pub async fn delete(&self, id: i64) -> Result<(), EquipmentServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete equipment")? {
            return Err(not_found(id));
        }
        tracing::info!("Deleted equipment {}", id);
        Ok(())
    }
}

fn not_found(id: i64) -> EquipmentServiceError {
    EquipmentServiceError::NotFound(format!("Equipment with ID {} not found", id))
}

fn validate_name(name: &str) -> Result<(), EquipmentServiceError> {
    if name.trim().is_empty() {
        return Err(EquipmentServiceError::ValidationError(
            "Name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

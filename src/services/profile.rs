//! Profile service
//!
//! Every user owns at most one profile. Profiles are created for the calling
//! user and looked up either by id or by owner.

use crate::db::repositories::{is_unique_violation, ProfileRepository};
use crate::models::{CreateProfileInput, ListParams, Profile, UpdateProfileInput};
use anyhow::Context;
use std::sync::Arc;

/// Error types for profile service operations
#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The user already owns a profile
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ProfileService {
    repo: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(repo: Arc<dyn ProfileRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, params: ListParams) -> Result<Vec<Profile>, ProfileServiceError> {
        Ok(self.repo.list(params).await.context("Failed to list profiles")?)
    }

    pub async fn get(&self, id: i64) -> Result<Profile, ProfileServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get profile")?
            .ok_or_else(|| ProfileServiceError::NotFound(format!("Profile with ID {} not found", id)))
    }

    /// Get the profile owned by `user_id`
    pub async fn get_for_user(&self, user_id: i64) -> Result<Profile, ProfileServiceError> {
        self.repo
            .get_by_user_id(user_id)
            .await
            .context("Failed to get profile by user")?
            .ok_or_else(|| ProfileServiceError::NotFound("Profile not found for current user".to_string()))
    }

    /// Create the profile of `user_id`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the nickname is blank
    /// - `Conflict` if the user already has a profile
    pub async fn create(
        &self,
        user_id: i64,
        input: CreateProfileInput,
    ) -> Result<Profile, ProfileServiceError> {
        validate_nickname(&input.nickname)?;

        if self
            .repo
            .get_by_user_id(user_id)
            .await
            .context("Failed to check existing profile")?
            .is_some()
        {
            return Err(already_exists());
        }

        let created = match self.repo.create(&Profile::from_input(user_id, &input)).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(already_exists()),
            Err(e) => return Err(e.context("Failed to create profile").into()),
        };

        tracing::info!("Created profile '{}' for user {}", created.nickname, user_id);
        Ok(created)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateProfileInput,
    ) -> Result<Profile, ProfileServiceError> {
        if let Some(nickname) = &input.nickname {
            validate_nickname(nickname)?;
        }

        let mut profile = self.get(id).await?;
        input.apply_to(&mut profile);
        profile.nickname = profile.nickname.trim().to_string();

        Ok(self.repo.update(&profile).await.context("Failed to update profile")?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ProfileServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete profile")? {
            return Err(ProfileServiceError::NotFound(format!("Profile with ID {} not found", id)));
        }
        Ok(())
    }
}

fn already_exists() -> ProfileServiceError {
    ProfileServiceError::Conflict("Profile already exists for this user".to_string())
}

fn validate_nickname(nickname: &str) -> Result<(), ProfileServiceError> {
    if nickname.trim().is_empty() {
        return Err(ProfileServiceError::ValidationError(
            "Nickname cannot be empty".to_string(),
        ));
    }
    Ok(())
}

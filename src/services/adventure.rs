//! Adventure service
//!
//! Implements business logic for adventures:
//! - Slug derivation and uniqueness
//! - Tag resolution on create and full tag replacement on update
//! - Newest-first listing with an optional status filter

use crate::db::repositories::{is_unique_violation, AdventureRepository};
use crate::models::{
    Adventure, AdventureStatus, CreateAdventureInput, ListParams, TagRef, UpdateAdventureInput,
};
use crate::services::slug::generate_slug;
use crate::services::tag::{TagService, TagServiceError};
use anyhow::Context;
use std::sync::Arc;

/// Error types for adventure service operations
#[derive(Debug, thiserror::Error)]
pub enum AdventureServiceError {
    /// Adventure not found
    #[error("Adventure not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Slug already used by another adventure
    #[error("Adventure with slug '{0}' already exists")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<TagServiceError> for AdventureServiceError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(msg) | TagServiceError::ValidationError(msg) => {
                AdventureServiceError::ValidationError(msg)
            }
            TagServiceError::InternalError(e) => AdventureServiceError::InternalError(e),
        }
    }
}

/// Adventure service
pub struct AdventureService {
    repo: Arc<dyn AdventureRepository>,
    tag_service: Arc<TagService>,
}

impl AdventureService {
    /// Create a new adventure service
    pub fn new(repo: Arc<dyn AdventureRepository>, tag_service: Arc<TagService>) -> Self {
        Self { repo, tag_service }
    }

    /// List adventures newest first
    pub async fn list(
        &self,
        params: ListParams,
        status: Option<AdventureStatus>,
    ) -> Result<Vec<Adventure>, AdventureServiceError> {
        Ok(self
            .repo
            .list(params, status)
            .await
            .context("Failed to list adventures")?)
    }

    /// Get adventure by ID
    pub async fn get(&self, id: i64) -> Result<Adventure, AdventureServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get adventure")?
            .ok_or_else(|| AdventureServiceError::NotFound(format!("Adventure with ID {} not found", id)))
    }

    /// Get adventure by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Adventure, AdventureServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get adventure by slug")?
            .ok_or_else(|| AdventureServiceError::NotFound(format!("Adventure '{}' not found", slug)))
    }

    /// Create an adventure authored by `user_id`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the title is blank, no slug can be derived, or a tag id is unknown
    /// - `DuplicateSlug` if the slug is already taken
    pub async fn create(
        &self,
        input: CreateAdventureInput,
        user_id: Option<i64>,
    ) -> Result<Adventure, AdventureServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AdventureServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }

        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => slug.to_string(),
            None => Self::slug_from_title(title)?,
        };

        if self
            .repo
            .exists_by_slug(&slug, None)
            .await
            .context("Failed to check slug")?
        {
            return Err(AdventureServiceError::DuplicateSlug(slug));
        }

        let tag_ids = self.resolve_tag_ids(&input.tags).await?;
        let adventure = Adventure::from_input(&input, slug, user_id);

        let created = self
            .repo
            .create(&adventure, &tag_ids)
            .await
            .map_err(|e| Self::map_write_error(e, &adventure.slug))?;

        tracing::info!("Created adventure '{}' (id {})", created.slug, created.id);
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// A changed title without an explicit slug regenerates the slug. A
    /// present tag list, even an empty one, replaces the whole tag set.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateAdventureInput,
    ) -> Result<Adventure, AdventureServiceError> {
        let existing = self.get(id).await?;

        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(AdventureServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
        }

        let explicit_slug = input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let new_title = input.title.as_deref().map(str::trim);
        let slug = match (explicit_slug, new_title) {
            (Some(slug), _) => slug.to_string(),
            (None, Some(title)) if title != existing.title => Self::slug_from_title(title)?,
            _ => existing.slug.clone(),
        };

        if slug != existing.slug
            && self
                .repo
                .exists_by_slug(&slug, Some(id))
                .await
                .context("Failed to check slug")?
        {
            return Err(AdventureServiceError::DuplicateSlug(slug));
        }

        let tag_ids = match &input.tags {
            Some(refs) => Some(self.resolve_tag_ids(refs).await?),
            None => None,
        };

        let mut updated = existing;
        input.apply_to(&mut updated);
        if let Some(title) = new_title {
            updated.title = title.to_string();
        }
        updated.slug = slug;

        let saved = self
            .repo
            .update(&updated, tag_ids.as_deref())
            .await
            .map_err(|e| Self::map_write_error(e, &updated.slug))?;

        tracing::info!("Updated adventure '{}' (id {})", saved.slug, saved.id);
        Ok(saved)
    }

    /// Delete an adventure; its tag links go with it
    pub async fn delete(&self, id: i64) -> Result<(), AdventureServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete adventure")?;
        if !deleted {
            return Err(AdventureServiceError::NotFound(format!(
                "Adventure with ID {} not found",
                id
            )));
        }
        tracing::info!("Deleted adventure {}", id);
        Ok(())
    }

    fn slug_from_title(title: &str) -> Result<String, AdventureServiceError> {
        let slug = generate_slug(title);
        if slug.is_empty() {
            return Err(AdventureServiceError::ValidationError(format!(
                "Cannot derive a slug from title '{}'",
                title
            )));
        }
        Ok(slug)
    }

    async fn resolve_tag_ids(&self, refs: &[TagRef]) -> Result<Vec<i64>, AdventureServiceError> {
        let tags = self.tag_service.resolve(refs).await?;
        Ok(tags.into_iter().map(|t| t.id).collect())
    }

    // A concurrent writer can take the slug between the check and the insert.
    fn map_write_error(err: anyhow::Error, slug: &str) -> AdventureServiceError {
        if is_unique_violation(&err) {
            AdventureServiceError::DuplicateSlug(slug.to_string())
        } else {
            AdventureServiceError::InternalError(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxAdventureRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> AdventureService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let tag_service = Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone())));
        AdventureService::new(SqlxAdventureRepository::boxed(pool), tag_service)
    }

    fn tag_names(adventure: &Adventure) -> Vec<&str> {
        adventure.tags.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_derives_slug_from_title() {
        let service = setup_test_service().await;

        let created = service
            .create(CreateAdventureInput::new("Schwäbische Alb", "d", "c"), None)
            .await
            .unwrap();

        assert_eq!(created.slug, "schwabische-alb");
        assert_eq!(created.status, AdventureStatus::Draft);
    }

    #[tokio::test]
    async fn test_create_keeps_explicit_slug() {
        let service = setup_test_service().await;

        let created = service
            .create(CreateAdventureInput::new("Alb", "d", "c").with_slug("my-alb-2025"), None)
            .await
            .unwrap();

        assert_eq!(created.slug, "my-alb-2025");
    }

    #[tokio::test]
    async fn test_create_duplicate_slug_conflicts() {
        let service = setup_test_service().await;
        service
            .create(CreateAdventureInput::new("Donau", "d", "c"), None)
            .await
            .unwrap();

        let result = service
            .create(CreateAdventureInput::new("DONAU!", "d", "c"), None)
            .await;

        assert!(matches!(result, Err(AdventureServiceError::DuplicateSlug(slug)) if slug == "donau"));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = setup_test_service().await;

        let blank = service.create(CreateAdventureInput::new("   ", "d", "c"), None).await;
        let unsluggable = service.create(CreateAdventureInput::new("!!!", "d", "c"), None).await;
        let unknown_tag = service
            .create(
                CreateAdventureInput::new("Alb", "d", "c")
                    .with_tags(vec![TagRef::from("Neu"), TagRef::Id(99)]),
                None,
            )
            .await;

        assert!(matches!(blank, Err(AdventureServiceError::ValidationError(_))));
        assert!(matches!(unsluggable, Err(AdventureServiceError::ValidationError(_))));
        assert!(matches!(unknown_tag, Err(AdventureServiceError::ValidationError(_))));
        assert!(service.list(ListParams::default(), None).await.unwrap().is_empty());
        assert!(service.tag_service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_attaches_duplicate_tag_once() {
        let service = setup_test_service().await;

        let created = service
            .create(
                CreateAdventureInput::new("Alb", "d", "c")
                    .with_tags(vec![TagRef::from("Bikepacking"), TagRef::from("Bikepacking")]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(tag_names(&created), vec!["Bikepacking"]);
    }

    #[tokio::test]
    async fn test_update_title_regenerates_slug() {
        let service = setup_test_service().await;
        let created = service
            .create(CreateAdventureInput::new("Alb", "d", "c"), None)
            .await
            .unwrap();

        let updated = service
            .update(created.id, UpdateAdventureInput::new().with_title("Über die Alb"))
            .await
            .unwrap();

        assert_eq!(updated.title, "Über die Alb");
        assert_eq!(updated.slug, "uber-die-alb");
        assert_eq!(updated.description, "d");
    }

    #[tokio::test]
    async fn test_update_same_title_keeps_custom_slug() {
        let service = setup_test_service().await;
        let created = service
            .create(CreateAdventureInput::new("Alb", "d", "c").with_slug("custom"), None)
            .await
            .unwrap();

        let updated = service
            .update(created.id, UpdateAdventureInput::new().with_title("Alb"))
            .await
            .unwrap();

        assert_eq!(updated.slug, "custom");
    }

    #[tokio::test]
    async fn test_update_slug_clash_conflicts() {
        let service = setup_test_service().await;
        service
            .create(CreateAdventureInput::new("Alb", "d", "c"), None)
            .await
            .unwrap();
        let other = service
            .create(CreateAdventureInput::new("Donau", "d", "c"), None)
            .await
            .unwrap();

        let by_slug = service
            .update(other.id, UpdateAdventureInput::new().with_slug("alb"))
            .await;
        let by_title = service
            .update(other.id, UpdateAdventureInput::new().with_title("ALB"))
            .await;

        assert!(matches!(by_slug, Err(AdventureServiceError::DuplicateSlug(_))));
        assert!(matches!(by_title, Err(AdventureServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_update_tags_replace_not_merge() {
        let service = setup_test_service().await;
        let created = service
            .create(
                CreateAdventureInput::new("Alb", "d", "c")
                    .with_tags(vec![TagRef::from("Gravel"), TagRef::from("Zelten")]),
                None,
            )
            .await
            .unwrap();

        let untouched = service
            .update(created.id, UpdateAdventureInput::new().with_status(AdventureStatus::Published))
            .await
            .unwrap();
        assert_eq!(tag_names(&untouched), vec!["Gravel", "Zelten"]);
        assert_eq!(untouched.status, AdventureStatus::Published);

        let replaced = service
            .update(created.id, UpdateAdventureInput::new().with_tags(vec![TagRef::from("Donau")]))
            .await
            .unwrap();
        assert_eq!(tag_names(&replaced), vec!["Donau"]);

        let cleared = service
            .update(created.id, UpdateAdventureInput::new().with_tags(vec![]))
            .await
            .unwrap();
        assert!(cleared.tags.is_empty());
    }

    #[tokio::test]
    async fn test_not_found() {
        let service = setup_test_service().await;

        assert!(matches!(service.get(42).await, Err(AdventureServiceError::NotFound(_))));
        assert!(matches!(service.get_by_slug("nope").await, Err(AdventureServiceError::NotFound(_))));
        assert!(matches!(
            service.update(42, UpdateAdventureInput::new()).await,
            Err(AdventureServiceError::NotFound(_))
        ));
        assert!(matches!(service.delete(42).await, Err(AdventureServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = setup_test_service().await;
        let created = service
            .create(CreateAdventureInput::new("Alb", "d", "c"), None)
            .await
            .unwrap();

        service.delete(created.id).await.unwrap();

        assert!(matches!(service.get(created.id).await, Err(AdventureServiceError::NotFound(_))));
    }
}

//! Tag service
//!
//! Resolves the tag references of an adventure payload into stored tags,
//! creating missing tags on the fly, and exposes the public tag listing.

use crate::db::repositories::{is_unique_violation, TagRepository};
use crate::models::{Tag, TagRef};
use anyhow::Context;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Resolve tag references into stored tags.
    ///
    /// Names are trimmed; blank names are skipped. An existing tag is reused
    /// when its name matches exactly (or, failing that, when its slug equals
    /// the derived slug); otherwise a new tag is created. Unknown ids are a
    /// validation error and are checked before any tag is created. The
    /// result holds each tag once, in first-seen order.
    pub async fn resolve(&self, refs: &[TagRef]) -> Result<Vec<Tag>, TagServiceError> {
        let mut slots: Vec<Option<Tag>> = Vec::with_capacity(refs.len());
        for tag_ref in refs {
            let slot = match tag_ref {
                TagRef::Id(id) => Some(
                    self.repo
                        .get_by_id(*id)
                        .await
                        .context("Failed to look up tag")?
                        .ok_or_else(|| {
                            TagServiceError::ValidationError(format!("Tag with ID {} does not exist", id))
                        })?,
                ),
                TagRef::Name(_) => None,
            };
            slots.push(slot);
        }

        for (slot, tag_ref) in slots.iter_mut().zip(refs) {
            if let TagRef::Name(name) = tag_ref {
                let name = name.trim();
                if !name.is_empty() {
                    *slot = Some(self.create_or_get(name).await?);
                }
            }
        }

        let mut resolved: Vec<Tag> = Vec::with_capacity(slots.len());
        for tag in slots.into_iter().flatten() {
            if !resolved.iter().any(|t| t.id == tag.id) {
                resolved.push(tag);
            }
        }

        Ok(resolved)
    }

    /// Get an existing tag by name or create it.
    ///
    /// A concurrent insert of the same tag surfaces as a unique violation;
    /// in that case the lookup is retried once.
    pub async fn create_or_get(&self, name: &str) -> Result<Tag, TagServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TagServiceError::ValidationError(
                "Tag name cannot be empty".to_string(),
            ));
        }

        if let Some(existing) = self.find_existing(name).await? {
            return Ok(existing);
        }

        match self.repo.create(&Tag::new(name)).await {
            Ok(created) => {
                tracing::info!("Created tag '{}' ({})", created.name, created.slug);
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!("Tag '{}' was created concurrently, retrying lookup", name);
                match self.find_existing(name).await? {
                    Some(existing) => Ok(existing),
                    None => Err(TagServiceError::InternalError(e)),
                }
            }
            Err(e) => Err(TagServiceError::InternalError(e)),
        }
    }

    async fn find_existing(&self, name: &str) -> Result<Option<Tag>, TagServiceError> {
        if let Some(tag) = self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to get tag by name")?
        {
            return Ok(Some(tag));
        }

        let slug = Tag::slug_for(name);
        Ok(self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to get tag by slug")?)
    }

    /// Get tag by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get tag by slug")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag '{}' not found", slug)))
    }

    /// List all tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.list().await.context("Failed to list tags")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_test_service() -> TagService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TagService::new(SqlxTagRepository::boxed(pool))
    }

    fn names(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_resolve_duplicate_names_once() {
        let service = setup_test_service().await;

        let tags = service
            .resolve(&[TagRef::from("Bikepacking"), TagRef::from("Bikepacking")])
            .await
            .unwrap();

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "bikepacking");
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_reuses_existing_and_keeps_order() {
        let service = setup_test_service().await;
        let gravel = service.create_or_get("Gravel").await.unwrap();

        let tags = service
            .resolve(&[
                TagRef::from("Alb"),
                TagRef::Id(gravel.id),
                TagRef::from("  Gravel  "),
                TagRef::from("   "),
                TagRef::from("Zelten"),
            ])
            .await
            .unwrap();

        assert_eq!(names(&tags), vec!["Alb", "Gravel", "Zelten"]);
        assert_eq!(tags[1].id, gravel.id);
    }

    #[tokio::test]
    async fn test_resolve_unknown_id_is_validation_error() {
        let service = setup_test_service().await;

        let result = service.resolve(&[TagRef::Id(4711)]).await;

        assert!(matches!(result, Err(TagServiceError::ValidationError(msg)) if msg.contains("4711")));
    }

    #[tokio::test]
    async fn test_unknown_id_creates_no_named_tags() {
        let service = setup_test_service().await;

        let result = service
            .resolve(&[TagRef::from("Neu"), TagRef::Id(9999)])
            .await;

        assert!(matches!(result, Err(TagServiceError::ValidationError(_))));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_empty() {
        let service = setup_test_service().await;
        assert!(service.resolve(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_names_differing_in_case_share_a_slug() {
        let service = setup_test_service().await;
        let first = service.create_or_get("Gravel").await.unwrap();

        let second = service.create_or_get("gravel").await.unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_create_or_get_rejects_blank() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.create_or_get("  ").await,
            Err(TagServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_get_by_slug() {
        let service = setup_test_service().await;
        service.create_or_get("Schwäbische Alb").await.unwrap();

        let tag = service.get_by_slug("schwäbische-alb").await.unwrap();
        assert_eq!(tag.name, "Schwäbische Alb");

        assert!(matches!(
            service.get_by_slug("missing").await,
            Err(TagServiceError::NotFound(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Resolving any list of names yields each distinct tag exactly once,
        /// in order of first appearance.
        #[test]
        fn property_resolve_dedups_in_first_seen_order(picks in prop::collection::vec(0usize..4, 0..12)) {
            let pool = ["Alb", "Gravel", "Donau", "Zelten"];
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let service = setup_test_service().await;
                let refs: Vec<TagRef> = picks.iter().map(|&i| TagRef::from(pool[i])).collect();

                let tags = service.resolve(&refs).await.unwrap();

                let mut expected: Vec<&str> = Vec::new();
                for &i in &picks {
                    if !expected.contains(&pool[i]) {
                        expected.push(pool[i]);
                    }
                }
                prop_assert_eq!(names(&tags), expected);
                Ok(())
            })?;
        }
    }
}

//! Tag model
//!
//! Tags are shared between adventures through the `adventure_tags` join table.

use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// URL-friendly slug (unique)
    pub slug: String,
}

impl Tag {
    /// Create a new Tag with a slug derived from the name.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = Self::slug_for(&name);
        Self { id: 0, name, slug }
    }

    /// Slug rule for tags: lowercase, spaces become hyphens.
    ///
    /// Deliberately simpler than the adventure slug generator so tag slugs
    /// stay recognisable for names that contain umlauts.
    pub fn slug_for(name: &str) -> String {
        name.trim().to_lowercase().replace(' ', "-")
    }
}

/// Reference to a tag inside an adventure payload: either an id or a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    Id(i64),
    Name(String),
}

impl From<i64> for TagRef {
    fn from(id: i64) -> Self {
        TagRef::Id(id)
    }
}

impl From<&str> for TagRef {
    fn from(name: &str) -> Self {
        TagRef::Name(name.to_string())
    }
}

impl From<String> for TagRef {
    fn from(name: String) -> Self {
        TagRef::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new_derives_slug() {
        let tag = Tag::new("Schwäbische Alb");

        assert_eq!(tag.id, 0);
        assert_eq!(tag.name, "Schwäbische Alb");
        assert_eq!(tag.slug, "schwäbische-alb");
    }

    #[test]
    fn test_tag_ref_untagged() {
        let refs: Vec<TagRef> = serde_json::from_str(r#"[1, "Gravel", 42]"#).unwrap();
        assert_eq!(
            refs,
            vec![TagRef::Id(1), TagRef::from("Gravel"), TagRef::from(42)]
        );

        assert_eq!(serde_json::to_string(&TagRef::Id(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&TagRef::from("x")).unwrap(), "\"x\"");
    }
}

//! Image model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded image, optionally attached to an adventure and/or equipment item.
///
/// At most one image per parent carries `is_cover = true`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub id: i64,
    /// Path relative to the media root, forward slashes (`YYYY/MM/<file>`)
    pub file_path: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_cover: bool,
    pub adventure_id: Option<i64>,
    pub equipment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting an image row after the file has been stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateImageInput {
    pub file_path: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_cover: bool,
    pub adventure_id: Option<i64>,
    pub equipment_id: Option<i64>,
}

impl CreateImageInput {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    pub fn for_adventure(mut self, adventure_id: i64) -> Self {
        self.adventure_id = Some(adventure_id);
        self
    }

    pub fn for_equipment(mut self, equipment_id: i64) -> Self {
        self.equipment_id = Some(equipment_id);
        self
    }

    pub fn as_cover(mut self) -> Self {
        self.is_cover = true;
        self
    }
}

/// Partial update of image metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateImageInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_cover: Option<bool>,
}

impl UpdateImageInput {
    pub fn has_changes(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.is_cover.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_input_builder() {
        let input = CreateImageInput::new("2025/05/abc.jpg").for_adventure(3).as_cover();

        assert_eq!(input.file_path, "2025/05/abc.jpg");
        assert_eq!(input.adventure_id, Some(3));
        assert_eq!(input.equipment_id, None);
        assert!(input.is_cover);
    }

    #[test]
    fn test_update_has_changes() {
        assert!(!UpdateImageInput::default().has_changes());
        let update: UpdateImageInput = serde_json::from_str(r#"{"is_cover": true}"#).unwrap();
        assert!(update.has_changes());
    }
}

//! Adventure model
//!
//! This module provides:
//! - `Adventure` entity representing a tour report
//! - `AdventureStatus` enum for publication states
//! - Input types for creating and updating adventures
//! - Skip/limit pagination used by every list endpoint

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Tag, TagRef};

/// Adventure entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adventure {
    pub id: i64,
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Short teaser text
    pub description: String,
    /// Full report body
    pub content: String,
    pub status: AdventureStatus,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    pub distance_km: Option<f64>,
    pub elevation_m: Option<i64>,
    pub difficulty: Option<String>,
    pub surface: Option<String>,
    pub gpx_file_path: Option<String>,
    /// Free-form "lat,lon" of the start point
    pub start_coordinates: Option<String>,
    pub equipment_notes: Option<String>,
    pub tips: Option<String>,
    pub cover_image: Option<String>,
    /// Author, if the account still exists
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attached tags, loaded through `adventure_tags`
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Adventure {
    /// Create a new draft adventure with no optional fields set.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(title: String, slug: String, description: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            slug,
            description,
            content,
            status: AdventureStatus::Draft,
            location: None,
            start_date: None,
            end_date: None,
            duration_days: None,
            distance_km: None,
            elevation_m: None,
            difficulty: None,
            surface: None,
            gpx_file_path: None,
            start_coordinates: None,
            equipment_notes: None,
            tips: None,
            cover_image: None,
            user_id: None,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        }
    }

    /// Build an unsaved adventure from a create payload and a resolved slug
    pub fn from_input(input: &CreateAdventureInput, slug: String, user_id: Option<i64>) -> Self {
        Self {
            status: input.status.unwrap_or_default(),
            location: input.location.clone(),
            start_date: input.start_date,
            end_date: input.end_date,
            duration_days: input.duration_days,
            distance_km: input.distance_km,
            elevation_m: input.elevation_m,
            difficulty: input.difficulty.clone(),
            surface: input.surface.clone(),
            gpx_file_path: input.gpx_file_path.clone(),
            start_coordinates: input.start_coordinates.clone(),
            equipment_notes: input.equipment_notes.clone(),
            tips: input.tips.clone(),
            cover_image: input.cover_image.clone(),
            user_id,
            ..Self::new(
                input.title.trim().to_string(),
                slug,
                input.description.clone(),
                input.content.clone(),
            )
        }
    }
}

/// Adventure publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdventureStatus {
    /// Not visible to readers yet
    #[default]
    Draft,
    Published,
    /// A tour that has not happened yet
    Planned,
}

impl AdventureStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AdventureStatus::Draft => "draft",
            AdventureStatus::Published => "published",
            AdventureStatus::Planned => "planned",
        }
    }

    /// Parse status from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(AdventureStatus::Draft),
            "published" => Some(AdventureStatus::Published),
            "planned" => Some(AdventureStatus::Planned),
            _ => None,
        }
    }
}

impl std::fmt::Display for AdventureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new adventure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAdventureInput {
    pub title: String,
    /// Derived from the title when absent or blank
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: Option<AdventureStatus>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub elevation_m: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub surface: Option<String>,
    #[serde(default)]
    pub gpx_file_path: Option<String>,
    #[serde(default)]
    pub start_coordinates: Option<String>,
    #[serde(default)]
    pub equipment_notes: Option<String>,
    #[serde(default)]
    pub tips: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Tag ids or names to attach
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

impl CreateAdventureInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_status(mut self, status: AdventureStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tags(mut self, tags: Vec<TagRef>) -> Self {
        self.tags = tags;
        self
    }
}

/// Partial update of an adventure
///
/// Only fields that are `Some` overwrite the stored value. `tags`, when
/// present, replaces the whole tag set (an empty list clears it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAdventureInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub status: Option<AdventureStatus>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    pub distance_km: Option<f64>,
    pub elevation_m: Option<i64>,
    pub difficulty: Option<String>,
    pub surface: Option<String>,
    pub gpx_file_path: Option<String>,
    pub start_coordinates: Option<String>,
    pub equipment_notes: Option<String>,
    pub tips: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<TagRef>>,
}

impl UpdateAdventureInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_status(mut self, status: AdventureStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tags(mut self, tags: Vec<TagRef>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Apply every present field onto `adventure`, leaving tags untouched
    pub fn apply_to(&self, adventure: &mut Adventure) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }

        set(&mut adventure.title, &self.title);
        set(&mut adventure.slug, &self.slug);
        set(&mut adventure.description, &self.description);
        set(&mut adventure.content, &self.content);
        set(&mut adventure.status, &self.status);
        set_opt(&mut adventure.location, &self.location);
        set_opt(&mut adventure.start_date, &self.start_date);
        set_opt(&mut adventure.end_date, &self.end_date);
        set_opt(&mut adventure.duration_days, &self.duration_days);
        set_opt(&mut adventure.distance_km, &self.distance_km);
        set_opt(&mut adventure.elevation_m, &self.elevation_m);
        set_opt(&mut adventure.difficulty, &self.difficulty);
        set_opt(&mut adventure.surface, &self.surface);
        set_opt(&mut adventure.gpx_file_path, &self.gpx_file_path);
        set_opt(&mut adventure.start_coordinates, &self.start_coordinates);
        set_opt(&mut adventure.equipment_notes, &self.equipment_notes);
        set_opt(&mut adventure.tips, &self.tips);
        set_opt(&mut adventure.cover_image, &self.cover_image);
    }
}

/// Skip/limit pagination for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Number of rows to skip
    pub skip: i64,
    /// Maximum number of rows to return (1..=100)
    pub limit: i64,
}

impl ListParams {
    /// Upper bound for `limit`
    pub const MAX_LIMIT: i64 = 100;

    /// Create pagination parameters, clamping `skip` to `>= 0` and `limit` to `1..=100`
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip: skip.max(0),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Build from optional query values with an endpoint specific default limit
    pub fn from_query(skip: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self::new(skip.unwrap_or(0), limit.unwrap_or(default_limit))
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self { skip: 0, limit: 10 }
    }
}

//! Profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public author profile. Each user has at most one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub nickname: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    /// Public contact address, may differ from the login email
    pub email: Option<String>,
    /// Arbitrary JSON object, e.g. `{"strava": "..."}`
    pub social_links: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn from_input(user_id: i64, input: &CreateProfileInput) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id,
            nickname: input.nickname.trim().to_string(),
            bio: input.bio.clone(),
            location: input.location.clone(),
            website: input.website.clone(),
            avatar_url: input.avatar_url.clone(),
            email: input.email.clone(),
            social_links: input.social_links.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProfileInput {
    pub nickname: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub social_links: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
    pub social_links: Option<serde_json::Value>,
}

impl UpdateProfileInput {
    /// Apply every present field onto `profile`
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(nickname) = &self.nickname {
            profile.nickname = nickname.clone();
        }
        for (target, value) in [
            (&mut profile.bio, &self.bio),
            (&mut profile.location, &self.location),
            (&mut profile.website, &self.website),
            (&mut profile.avatar_url, &self.avatar_url),
            (&mut profile.email, &self.email),
        ] {
            if value.is_some() {
                *target = value.clone();
            }
        }
        if self.social_links.is_some() {
            profile.social_links = self.social_links.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_to_keeps_absent_fields() {
        let now = Utc::now();
        let mut profile = Profile {
            id: 1,
            user_id: 1,
            nickname: "Schwob".to_string(),
            bio: Some("Rides bikes".to_string()),
            location: None,
            website: None,
            avatar_url: None,
            email: None,
            social_links: None,
            created_at: now,
            updated_at: now,
        };

        UpdateProfileInput {
            location: Some("Tübingen".to_string()),
            social_links: Some(serde_json::json!({"komoot": "schwob"})),
            ..Default::default()
        }
        .apply_to(&mut profile);

        assert_eq!(profile.nickname, "Schwob");
        assert_eq!(profile.bio.as_deref(), Some("Rides bikes"));
        assert_eq!(profile.location.as_deref(), Some("Tübingen"));
        assert_eq!(profile.social_links.unwrap()["komoot"], "schwob");
    }
}

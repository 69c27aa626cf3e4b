//! Equipment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A piece of gear used on tours
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Free-form grouping such as "bags" or "sleep system"
    pub category: Option<String>,
    /// Weight in grams
    pub weight_g: Option<i64>,
    pub price: Option<f64>,
    pub purchase_link: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Build an unsaved item from a create payload; the name is trimmed
    pub fn from_input(input: &CreateEquipmentInput) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            category: input.category.clone(),
            weight_g: input.weight_g,
            price: input.price,
            purchase_link: input.purchase_link.clone(),
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEquipmentInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub weight_g: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub purchase_link: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateEquipmentInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEquipmentInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub weight_g: Option<i64>,
    pub price: Option<f64>,
    pub purchase_link: Option<String>,
    pub notes: Option<String>,
}

impl UpdateEquipmentInput {
    /// Apply every present field onto `equipment`
    pub fn apply_to(&self, equipment: &mut Equipment) {
        if let Some(name) = &self.name {
            equipment.name = name.clone();
        }
        if self.description.is_some() {
            equipment.description = self.description.clone();
        }
        if self.category.is_some() {
            equipment.category = self.category.clone();
        }
        if self.weight_g.is_some() {
            equipment.weight_g = self.weight_g;
        }
        if self.price.is_some() {
            equipment.price = self.price;
        }
        if self.purchase_link.is_some() {
            equipment.purchase_link = self.purchase_link.clone();
        }
        if self.notes.is_some() {
            equipment.notes = self.notes.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_to() {
        let now = Utc::now();
        let mut equipment = Equipment {
            id: 1,
            name: "Tent".to_string(),
            description: Some("1p".to_string()),
            category: None,
            weight_g: Some(900),
            price: None,
            purchase_link: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        UpdateEquipmentInput {
            weight_g: Some(850),
            category: Some("sleep".to_string()),
            ..Default::default()
        }
        .apply_to(&mut equipment);

        assert_eq!(equipment.name, "Tent");
        assert_eq!(equipment.description.as_deref(), Some("1p"));
        assert_eq!(equipment.weight_g, Some(850));
        assert_eq!(equipment.category.as_deref(), Some("sleep"));
    }
}

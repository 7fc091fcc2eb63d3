//! # Records
//!
//! The four persisted record kinds and the input forms that create them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LostFoundError, Result};
use crate::types::{
    Category, ClaimId, ItemId, ItemStatus, ItemType, MatchId, MatchMethod, MatchScore, UserId,
};

/// Maximum length of an item name.
pub const MAX_NAME_LEN: usize = 100;
/// Maximum length of an item location.
pub const MAX_LOCATION_LEN: usize = 200;
/// Maximum length of an item's contact info.
pub const MAX_CONTACT_LEN: usize = 100;
/// Maximum length of a username.
pub const MAX_USERNAME_LEN: usize = 150;

// =============================================================================
// USER
// =============================================================================

/// A registered community member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// ITEM
// =============================================================================

/// A reported lost or found object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: Category,
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub image: Option<String>,
    pub contact_info: String,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Build a freshly reported item. Reports always start pending.
    #[must_use]
    pub fn reported(
        id: ItemId,
        owner: UserId,
        item_type: ItemType,
        form: ItemForm,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: form.name,
            category: form.category,
            item_type,
            status: ItemStatus::Pending,
            description: form.description,
            location: form.location,
            date: form.date,
            image: form.image,
            contact_info: form.contact_info,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the editable fields. Type, status and owner are untouched.
    pub fn apply(&mut self, form: ItemForm, now: DateTime<Utc>) {
        self.name = form.name;
        self.category = form.category;
        self.description = form.description;
        self.location = form.location;
        self.date = form.date;
        self.image = form.image;
        self.contact_info = form.contact_info;
        self.updated_at = now;
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == ItemStatus::Approved
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// `"<name> (Lost)"` style title.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} ({})", self.name, self.item_type.label())
    }
}

/// Editable fields of an item, as submitted by the report and update forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemForm {
    pub name: String,
    pub category: Category,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub image: Option<String>,
    pub contact_info: String,
}

impl ItemForm {
    /// Trim every text field and enforce the field constraints.
    pub fn clean(self) -> Result<Self> {
        let name = required("name", &self.name, Some(MAX_NAME_LEN))?;
        let description = required("description", &self.description, None)?;
        let location = required("location", &self.location, Some(MAX_LOCATION_LEN))?;
        let contact_info = required("contact_info", &self.contact_info, Some(MAX_CONTACT_LEN))?;
        let image = self
            .image
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            name,
            category: self.category,
            description,
            location,
            date: self.date,
            image,
            contact_info,
        })
    }
}

fn required(field: &str, value: &str, max_len: Option<usize>) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LostFoundError::Validation(format!("{} is required", field)));
    }
    if let Some(max) = max_len {
        let len = trimmed.chars().count();
        if len > max {
            return Err(LostFoundError::Validation(format!(
                "{} has {} characters, at most {} allowed",
                field, len, max
            )));
        }
    }
    Ok(trimmed.to_string())
}

// =============================================================================
// CLAIM
// =============================================================================

/// A user's assertion of ownership over another user's item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub item: ItemId,
    pub claimed_by: UserId,
    pub claim_date: DateTime<Utc>,
    pub approved: bool,
}

// =============================================================================
// ITEM MATCH
// =============================================================================

/// A computed candidate pairing of a lost item with a found item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMatch {
    pub id: MatchId,
    pub lost_item: ItemId,
    pub found_item: ItemId,
    pub score: MatchScore,
    pub method: MatchMethod,
    pub created_at: DateTime<Utc>,
    pub notified: bool,
}

impl ItemMatch {
    /// Whether this match pairs the given item (on either side).
    #[must_use]
    pub fn involves(&self, item: ItemId) -> bool {
        self.lost_item == item || self.found_item == item
    }
}

/// Validate a username for registration.
pub fn clean_username(username: &str) -> Result<String> {
    let name = required("username", username, Some(MAX_USERNAME_LEN))?;
    if name.chars().any(char::is_whitespace) {
        return Err(LostFoundError::Validation(
            "username must not contain whitespace".to_string(),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ItemForm {
        ItemForm {
            name: "  Black Wallet ".to_string(),
            category: Category::Accessories,
            description: "Leather wallet".to_string(),
            location: "Gym".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap_or_default(),
            image: Some("   ".to_string()),
            contact_info: "a@b.c".to_string(),
        }
    }

    #[test]
    fn clean_trims_and_drops_blank_image() {
        let cleaned = form().clean();
        assert!(cleaned.is_ok());
        let cleaned = cleaned.unwrap_or_else(|_| form());
        assert_eq!(cleaned.name, "Black Wallet");
        assert_eq!(cleaned.image, None);
    }

    #[test]
    fn clean_rejects_empty_description() {
        let mut f = form();
        f.description = "   ".to_string();
        assert!(matches!(f.clean(), Err(LostFoundError::Validation(_))));
    }

    #[test]
    fn clean_rejects_overlong_location() {
        let mut f = form();
        f.location = "x".repeat(MAX_LOCATION_LEN + 1);
        assert!(matches!(f.clean(), Err(LostFoundError::Validation(_))));
    }

    #[test]
    fn username_without_whitespace() {
        assert!(clean_username("alice").is_ok());
        assert!(clean_username("al ice").is_err());
        assert!(clean_username("").is_err());
    }
}

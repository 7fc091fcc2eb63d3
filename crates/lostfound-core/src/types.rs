//! # Core Types
//!
//! Identifiers and closed vocabularies shared by every module.
//!
//! All identifiers are `u64` newtypes ordered by allocation, so `BTreeMap`
//! iteration over them is creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LostFoundError;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Record kind used in error messages.
            pub const KIND: &'static str = $kind;

            /// Raw numeric value.
            #[must_use]
            pub fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a registered user.
    UserId,
    "user"
);
id_type!(
    /// Identifier of a reported item.
    ItemId,
    "item"
);
id_type!(
    /// Identifier of a claim.
    ClaimId,
    "claim"
);
id_type!(
    /// Identifier of a computed match.
    MatchId,
    "match"
);

// =============================================================================
// CATEGORY
// =============================================================================

/// Item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Clothing,
    Accessories,
    Documents,
    Keys,
    Bags,
    Other,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 7] = [
        Category::Electronics,
        Category::Clothing,
        Category::Accessories,
        Category::Documents,
        Category::Keys,
        Category::Bags,
        Category::Other,
    ];

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Electronics => "electronics",
            Self::Clothing => "clothing",
            Self::Accessories => "accessories",
            Self::Documents => "documents",
            Self::Keys => "keys",
            Self::Bags => "bags",
            Self::Other => "other",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Clothing => "Clothing",
            Self::Accessories => "Accessories",
            Self::Documents => "Documents",
            Self::Keys => "Keys",
            Self::Bags => "Bags",
            Self::Other => "Other",
        }
    }

    /// Icon name shown next to the category on the home page.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Electronics => "fas fa-mobile-alt",
            Self::Bags => "fas fa-shopping-bag",
            Self::Keys => "fas fa-key",
            Self::Accessories => "fas fa-watch",
            Self::Clothing => "fas fa-tshirt",
            Self::Documents => "fas fa-file-alt",
            Self::Other => "fas fa-question-circle",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LostFoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LostFoundError::Validation(format!("unknown category '{}'", s)))
    }
}

// =============================================================================
// ITEM TYPE
// =============================================================================

/// Whether an item was lost or found. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Lost,
    Found,
}

impl ItemType {
    /// The type an item must have to pair with this one.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Lost => Self::Found,
            Self::Found => Self::Lost,
        }
    }

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lost => "lost",
            Self::Found => "found",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Lost => "Lost",
            Self::Found => "Found",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = LostFoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lost" => Ok(Self::Lost),
            "found" => Ok(Self::Found),
            other => Err(LostFoundError::Validation(format!(
                "unknown item type '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// ITEM STATUS
// =============================================================================

/// Moderation and resolution status of an item.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Approved,
    Claimed,
    Returned,
    Rejected,
}

impl ItemStatus {
    /// Every status, in declaration order.
    pub const ALL: [ItemStatus; 5] = [
        ItemStatus::Pending,
        ItemStatus::Approved,
        ItemStatus::Claimed,
        ItemStatus::Returned,
        ItemStatus::Rejected,
    ];

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Claimed => "claimed",
            Self::Returned => "returned",
            Self::Rejected => "rejected",
        }
    }

    /// Claimed or returned: the item reached its owner.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Claimed | Self::Returned)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = LostFoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LostFoundError::Validation(format!("unknown status '{}'", s)))
    }
}

// =============================================================================
// MATCH SCORE
// =============================================================================

/// Upper bound of every match score.
pub const MAX_SCORE: u8 = 100;

/// A match score in `0..=100`.
///
/// Construction clamps, so a stored score can never leave the range.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MatchScore(u8);

impl MatchScore {
    /// Create a score, clamping to [`MAX_SCORE`].
    #[must_use]
    pub fn new(points: u32) -> Self {
        Self(points.min(MAX_SCORE as u32) as u8)
    }

    /// Score points.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for MatchScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Which heuristic produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// Containment scorer run when an item is reported.
    Report,
    /// Similarity scorer run by the batch matcher.
    Batch,
}

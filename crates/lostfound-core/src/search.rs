//! # Search Module
//!
//! Catalog search with progressive query relaxation.
//!
//! The strict query applies every filter the caller gave. When a search was
//! performed and the strict query returns nothing, the query is widened tier
//! by tier until some tier produces rows:
//!
//! ```text
//! strict -> keyword -> category keyword -> synonym -> category
//!        -> location -> item type -> popular category -> recent
//! ```
//!
//! Only approved items are ever searched. Results are newest first.

use std::num::IntErrorKind;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::Item;
use crate::types::{Category, ItemType};

/// Items per result page.
pub const PAGE_SIZE: usize = 10;

/// Relaxed keyword tiers ignore terms of this length or shorter.
const MIN_RELAXED_TERM_LEN: usize = 2;

/// Words that imply a category, checked in order as substrings of the query.
pub const CATEGORY_KEYWORDS: &[(&str, Category)] = &[
    ("phone", Category::Electronics),
    ("mobile", Category::Electronics),
    ("laptop", Category::Electronics),
    ("computer", Category::Electronics),
    ("tablet", Category::Electronics),
    ("iphone", Category::Electronics),
    ("samsung", Category::Electronics),
    ("apple", Category::Electronics),
    ("android", Category::Electronics),
    ("airpods", Category::Electronics),
    ("headphones", Category::Electronics),
    ("earbuds", Category::Electronics),
    ("charger", Category::Electronics),
    ("cable", Category::Electronics),
    ("mouse", Category::Electronics),
    ("keyboard", Category::Electronics),
    ("speaker", Category::Electronics),
    ("camera", Category::Electronics),
    ("shirt", Category::Clothing),
    ("jacket", Category::Clothing),
    ("pants", Category::Clothing),
    ("shoes", Category::Clothing),
    ("dress", Category::Clothing),
    ("hoodie", Category::Clothing),
    ("jeans", Category::Clothing),
    ("sweater", Category::Clothing),
    ("coat", Category::Clothing),
    ("watch", Category::Accessories),
    ("glasses", Category::Accessories),
    ("jewelry", Category::Accessories),
    ("ring", Category::Accessories),
    ("necklace", Category::Accessories),
    ("bracelet", Category::Accessories),
    ("wallet", Category::Accessories),
    ("sunglasses", Category::Accessories),
    ("hat", Category::Accessories),
    ("purse", Category::Bags),
    ("backpack", Category::Bags),
    ("bag", Category::Bags),
    ("luggage", Category::Bags),
    ("suitcase", Category::Bags),
    ("briefcase", Category::Bags),
    ("handbag", Category::Bags),
    ("key", Category::Keys),
    ("keys", Category::Keys),
    ("keychain", Category::Keys),
    ("fob", Category::Keys),
    ("id", Category::Documents),
    ("passport", Category::Documents),
    ("license", Category::Documents),
    ("card", Category::Documents),
    ("certificate", Category::Documents),
    ("paper", Category::Documents),
];

/// Common product names and the plainer words people use for them.
pub const SYNONYMS: &[(&str, &[&str])] = &[
    ("iphone", &["phone", "apple", "mobile"]),
    ("airpod", &["earbuds", "headphones", "apple"]),
    ("samsung", &["phone", "galaxy", "mobile"]),
    ("macbook", &["laptop", "apple", "computer"]),
    ("ipad", &["tablet", "apple"]),
    ("backpack", &["bag", "school"]),
    ("wallet", &["money", "cards"]),
    ("glasses", &["eyewear", "prescription"]),
    ("keys", &["key", "car", "house", "dorm"]),
];

/// Fallback categories, most commonly reported first.
pub const POPULAR_CATEGORIES: [Category; 6] = [
    Category::Electronics,
    Category::Bags,
    Category::Keys,
    Category::Accessories,
    Category::Clothing,
    Category::Documents,
];

// =============================================================================
// QUERY
// =============================================================================

/// Filters accepted by the catalog search. Blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub item_type: Option<ItemType>,
}

impl SearchQuery {
    /// Free-text query with a keyword.
    #[must_use]
    pub fn text(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Self::default()
        }
    }

    /// Trimmed, non-empty search text.
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }

    /// Trimmed, non-empty location filter.
    #[must_use]
    pub fn location_text(&self) -> Option<&str> {
        non_blank(self.location.as_deref())
    }

    /// Whether any filter is set.
    #[must_use]
    pub fn is_performed(&self) -> bool {
        self.search_text().is_some()
            || self.category.is_some()
            || self.date_from.is_some()
            || self.date_to.is_some()
            || self.location_text().is_some()
            || self.item_type.is_some()
    }

    /// Whether an approved item passes every strict filter.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(text) = self.search_text() {
            let terms = lowered_terms(text);
            let hit = terms.iter().any(|term| {
                contains_ci(&item.name, term)
                    || contains_ci(&item.description, term)
                    || contains_ci(&item.location, term)
                    || item.category.as_str().contains(term.as_str())
                    || contains_ci(&item.contact_info, term)
            });
            if !hit {
                return false;
            }
        }
        if self.category.is_some_and(|c| c != item.category) {
            return false;
        }
        if self.date_from.is_some_and(|from| item.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| item.date > to) {
            return false;
        }
        if let Some(location) = self.location_text() {
            if !contains_ci(&item.location, &location.to_lowercase()) {
                return false;
            }
        }
        if self.item_type.is_some_and(|t| t != item.item_type) {
            return false;
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn lowered_terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// `needle` must already be lowercase.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

// =============================================================================
// OUTCOME
// =============================================================================

/// The query tier that produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "tier", content = "category")]
pub enum SearchTier {
    /// All filters applied (or no filters given).
    Strict,
    /// Any search term longer than two characters in name, description or location.
    Keyword,
    /// A word in the query implied this category.
    CategoryKeyword(Category),
    /// A product name in the query expanded to plainer synonyms.
    Synonym,
    /// Only the category filter.
    Category(Category),
    /// Any location term longer than two characters.
    Location,
    /// Only the item type filter.
    ItemType,
    /// The first popular category with items.
    PopularCategory(Category),
    /// Everything approved, newest first.
    Recent,
}

impl SearchTier {
    /// Whether the strict query failed and a relaxed tier answered instead.
    #[must_use]
    pub fn is_relaxed(self) -> bool {
        self != Self::Strict
    }

    /// Human wording of the tier, as shown above its results.
    #[must_use]
    pub fn describe(self) -> String {
        match self {
            Self::Strict => "exact matches".to_string(),
            Self::Keyword => "items matching any of your words".to_string(),
            Self::CategoryKeyword(c) => format!("{} items related to your search", c.label()),
            Self::Synonym => "items matching similar terms".to_string(),
            Self::Category(c) => format!("all {} items", c.label()),
            Self::Location => "items near a similar location".to_string(),
            Self::ItemType => "items of the same type".to_string(),
            Self::PopularCategory(c) => format!("popular {} items", c.label()),
            Self::Recent => "the most recent items".to_string(),
        }
    }
}

/// Result of [`search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub tier: SearchTier,
    pub performed: bool,
    /// Approved items before filtering.
    pub total_items: usize,
    pub items: Vec<Item>,
}

/// Run the strict query and, if it comes back empty, relax it.
#[must_use]
pub fn search(catalog: &[Item], query: &SearchQuery) -> SearchOutcome {
    let approved = approved_newest_first(catalog);
    let performed = query.is_performed();
    let total_items = approved.len();

    let strict: Vec<&Item> = approved
        .iter()
        .copied()
        .filter(|item| query.matches(item))
        .collect();

    let (tier, rows) = if performed && strict.is_empty() {
        relax(&approved, query)
    } else {
        (SearchTier::Strict, strict)
    };

    SearchOutcome {
        tier,
        performed,
        total_items,
        items: rows.into_iter().cloned().collect(),
    }
}

/// Approved items, newest first (ties broken by higher id).
#[must_use]
pub fn approved_newest_first(catalog: &[Item]) -> Vec<&Item> {
    let mut approved: Vec<&Item> = catalog.iter().filter(|i| i.is_approved()).collect();
    sort_newest_first(&mut approved);
    approved
}

/// Sort references newest first.
pub fn sort_newest_first(items: &mut [&Item]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// The relaxation waterfall. `approved` is already newest first.
fn relax<'a>(approved: &[&'a Item], query: &SearchQuery) -> (SearchTier, Vec<&'a Item>) {
    let select = |pred: &dyn Fn(&Item) -> bool| -> Vec<&'a Item> {
        approved.iter().copied().filter(|&i| pred(i)).collect()
    };

    if let Some(text) = query.search_text() {
        let lowered = text.to_lowercase();

        let terms: Vec<String> = lowered_terms(text)
            .into_iter()
            .filter(|t| t.chars().count() > MIN_RELAXED_TERM_LEN)
            .collect();
        if !terms.is_empty() {
            let rows = select(&|item| {
                terms.iter().any(|t| {
                    contains_ci(&item.name, t)
                        || contains_ci(&item.description, t)
                        || contains_ci(&item.location, t)
                })
            });
            if !rows.is_empty() {
                return (SearchTier::Keyword, rows);
            }
        }

        for (keyword, category) in CATEGORY_KEYWORDS {
            if lowered.contains(keyword) {
                let rows = select(&|item| item.category == *category);
                if !rows.is_empty() {
                    return (SearchTier::CategoryKeyword(*category), rows);
                }
            }
        }

        for (main_term, related) in SYNONYMS {
            if lowered.contains(main_term) {
                let rows = select(&|item| {
                    related.iter().any(|r| {
                        contains_ci(&item.name, r) || contains_ci(&item.description, r)
                    })
                });
                if !rows.is_empty() {
                    return (SearchTier::Synonym, rows);
                }
            }
        }
    }

    if let Some(category) = query.category {
        let rows = select(&|item| item.category == category);
        if !rows.is_empty() {
            return (SearchTier::Category(category), rows);
        }
    }

    if let Some(location) = query.location_text() {
        let terms: Vec<String> = lowered_terms(location)
            .into_iter()
            .filter(|t| t.chars().count() > MIN_RELAXED_TERM_LEN)
            .collect();
        if !terms.is_empty() {
            let rows = select(&|item| terms.iter().any(|t| contains_ci(&item.location, t)));
            if !rows.is_empty() {
                return (SearchTier::Location, rows);
            }
        }
    }

    if let Some(item_type) = query.item_type {
        let rows = select(&|item| item.item_type == item_type);
        if !rows.is_empty() {
            return (SearchTier::ItemType, rows);
        }
    }

    for category in POPULAR_CATEGORIES {
        let rows = select(&|item| item.category == category);
        if !rows.is_empty() {
            return (SearchTier::PopularCategory(category), rows);
        }
    }

    (SearchTier::Recent, approved.to_vec())
}

// =============================================================================
// PAGINATION
// =============================================================================

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub total: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub items: Vec<T>,
}

/// Cut one page out of `rows`.
///
/// A missing or non-numeric page yields page 1; a number below 1 or past the
/// end yields the last page, even one too large for an `i64`. An empty
/// result still has one (empty) page.
#[must_use]
pub fn paginate<T>(rows: Vec<T>, page: Option<&str>, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = rows.len();
    let num_pages = total.div_ceil(per_page).max(1);

    let number = match page.map(str::trim).map(str::parse::<i64>) {
        Some(Err(e))
            if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) =>
        {
            num_pages
        }
        None | Some(Err(_)) => 1,
        Some(Ok(n)) if n < 1 => num_pages,
        Some(Ok(n)) => (n as usize).min(num_pages),
    };

    let start = (number - 1).saturating_mul(per_page);
    let items: Vec<T> = rows.into_iter().skip(start).take(per_page).collect();

    Page {
        number,
        num_pages,
        per_page,
        total,
        has_next: number < num_pages,
        has_previous: number > 1,
        items,
    }
}

impl<T> Page<T> {
    /// Transform the page's rows, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            per_page: self.per_page,
            total: self.total,
            has_next: self.has_next,
            has_previous: self.has_previous,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

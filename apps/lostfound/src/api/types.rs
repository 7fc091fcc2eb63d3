//! Request and response bodies of the HTTP API.
//!
//! Catalog records and page views serialize as they are; the types here
//! cover what only the HTTP surface needs.

use chrono::NaiveDate;
use lostfound_core::stats::{DayCount, MAX_CHART_DAYS};
use lostfound_core::{
    Category, Item, ItemMatch, ItemType, LostFoundError, Message, Moderation, Page, SearchQuery,
    SearchTier, SuccessMetrics,
};
use serde::{Deserialize, Serialize};

/// Default window of `/api/items-by-date`.
pub const DEFAULT_CHART_DAYS: u32 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Query string of `GET /api/items`. Every filter arrives as text so that
/// blank form fields count as unset.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ItemsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub item_type: Option<String>,
    pub location: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, LostFoundError> {
    non_blank(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| {
                LostFoundError::Validation(format!("{} must be a YYYY-MM-DD date", field))
            })
        })
        .transpose()
}

impl ItemsQuery {
    /// The catalog query these parameters describe.
    pub fn to_search(&self) -> Result<SearchQuery, LostFoundError> {
        Ok(SearchQuery {
            search: non_blank(self.search.as_deref()).map(str::to_string),
            category: non_blank(self.category.as_deref())
                .map(str::parse::<Category>)
                .transpose()?,
            item_type: non_blank(self.item_type.as_deref())
                .map(str::parse::<ItemType>)
                .transpose()?,
            location: non_blank(self.location.as_deref()).map(str::to_string),
            date_from: parse_date("date_from", self.date_from.as_deref())?,
            date_to: parse_date("date_to", self.date_to.as_deref())?,
        })
    }
}

/// Body of `GET /api/items`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search_performed: bool,
    /// The strict query found nothing and a relaxed tier answered.
    pub relaxed: bool,
    pub tier: SearchTier,
    /// Explanation shown above relaxed results.
    pub message: Option<String>,
    /// Approved items before filtering.
    pub total_items: usize,
    pub page: Page<Item>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemsByDateQuery {
    pub days: Option<u32>,
}

impl ItemsByDateQuery {
    pub fn days(&self) -> u32 {
        self.days
            .unwrap_or(DEFAULT_CHART_DAYS)
            .clamp(1, MAX_CHART_DAYS)
    }
}

/// Chart data, wrapped the way the dashboard widget expects it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsByDateResponse {
    pub data: Vec<DayCount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModerateRequest {
    pub decision: Moderation,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunMatchingQuery {
    #[serde(default)]
    pub notify: bool,
}

/// Messages handed to the notifier by an admin matching run.
#[derive(Debug, Serialize)]
pub struct NotificationSummary {
    pub match_messages: Vec<Message>,
    pub reminders: Vec<Message>,
    pub failed: usize,
    pub metrics: SuccessMetrics,
}

#[derive(Debug, Serialize)]
pub struct RunMatchingResponse {
    pub pairs_examined: usize,
    pub created: Vec<ItemMatch>,
    pub notifications: Option<NotificationSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_unset() {
        let query = ItemsQuery {
            search: Some("  ".into()),
            category: Some(String::new()),
            ..ItemsQuery::default()
        };
        assert_eq!(query.to_search(), Ok(SearchQuery::default()));
    }

    #[test]
    fn filters_are_parsed() {
        let query = ItemsQuery {
            search: Some(" wallet ".into()),
            category: Some("Accessories".into()),
            item_type: Some("found".into()),
            date_from: Some("2024-05-01".into()),
            ..ItemsQuery::default()
        };
        let parsed = query.to_search();
        assert!(parsed.is_ok());
        let Ok(parsed) = parsed else { return };
        assert_eq!(parsed.search.as_deref(), Some("wallet"));
        assert_eq!(parsed.category, Some(Category::Accessories));
        assert_eq!(parsed.item_type, Some(ItemType::Found));
        assert_eq!(parsed.date_from, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn bad_filters_are_validation_errors() {
        let query = ItemsQuery {
            date_to: Some("last week".into()),
            ..ItemsQuery::default()
        };
        assert!(matches!(query.to_search(), Err(LostFoundError::Validation(_))));
        let query = ItemsQuery {
            category: Some("pets".into()),
            ..ItemsQuery::default()
        };
        assert!(query.to_search().is_err());
    }

    #[test]
    fn chart_window_is_clamped() {
        assert_eq!(ItemsByDateQuery::default().days(), DEFAULT_CHART_DAYS);
        assert_eq!(ItemsByDateQuery { days: Some(0) }.days(), 1);
        assert_eq!(ItemsByDateQuery { days: Some(9999) }.days(), MAX_CHART_DAYS);
    }
}

//! # Statistics Module
//!
//! Catalog analytics: the statistics page, the success dashboard, the date
//! chart series and the home page figures.
//!
//! Every function here is a pure fold over record slices. Rates are carried
//! as [`Permille`] (tenths of a percent) so no float ever appears.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Claim, Item, ItemMatch};
use crate::search::sort_newest_first;
use crate::types::{Category, ItemId, ItemStatus, ItemType};

/// Rows in each "recent" list of the statistics page.
pub const RECENT_LIMIT: usize = 5;
/// Locations listed on the statistics page.
pub const TOP_LOCATIONS: usize = 5;
/// Days covered by the statistics and success charts.
pub const CHART_DAYS: u32 = 30;
/// Matches listed on the success dashboard.
pub const RECENT_MATCHES: usize = 10;
/// Approved items shown on the home page.
pub const HOME_RECENT_ITEMS: usize = 6;
/// Characters of description kept in home page previews.
pub const PREVIEW_CHARS: usize = 100;
/// Categories highlighted on the home page.
pub const FEATURED_CATEGORIES: [Category; 4] = [
    Category::Electronics,
    Category::Bags,
    Category::Keys,
    Category::Accessories,
];

const DETAILED_DESCRIPTION_CHARS: usize = 50;
const SPECIFIC_LOCATION_CHARS: usize = 20;

// =============================================================================
// PERMILLE
// =============================================================================

/// A rate in tenths of a percent (`125` is 12.5%).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Permille(pub u32);

impl Permille {
    /// 100%.
    pub const FULL: Self = Self(1000);

    /// `part / whole`, rounded half-up. Zero when `whole` is zero.
    #[must_use]
    pub fn ratio(part: usize, whole: usize) -> Self {
        if whole == 0 {
            return Self(0);
        }
        let part = part as u64;
        let whole = whole as u64;
        let scaled = part.saturating_mul(2000).saturating_add(whole) / whole.saturating_mul(2);
        Self(scaled.min(u32::MAX as u64) as u32)
    }

    /// Cap at 100%.
    #[must_use]
    pub fn capped(self) -> Self {
        self.min(Self::FULL)
    }

    #[must_use]
    pub fn tenths(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Permille {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}%", self.0 / 10, self.0 % 10)
    }
}

// =============================================================================
// SHARED ROWS
// =============================================================================

/// A grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally<K> {
    pub key: K,
    pub count: usize,
}

/// Lost and found reports dated on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub lost: usize,
    pub found: usize,
}

/// Group by key, largest count first (ties by key order).
fn tally<K: Ord + Clone>(keys: impl Iterator<Item = K>) -> Vec<Tally<K>> {
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut rows: Vec<Tally<K>> = counts
        .into_iter()
        .map(|(key, count)| Tally { key, count })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    rows
}

fn count_type(items: &[Item], item_type: ItemType) -> usize {
    items.iter().filter(|i| i.item_type == item_type).count()
}

fn count_status(items: &[Item], status: ItemStatus) -> usize {
    items.iter().filter(|i| i.status == status).count()
}

fn recent_of_type(items: &[Item], item_type: ItemType, limit: usize) -> Vec<Item> {
    let mut rows: Vec<&Item> = items.iter().filter(|i| i.item_type == item_type).collect();
    sort_newest_first(&mut rows);
    rows.into_iter().take(limit).cloned().collect()
}

/// Matches where either side has reached its owner.
pub(crate) fn successful_matches(items: &[Item], matches: &[ItemMatch]) -> usize {
    let resolved: BTreeSet<ItemId> = items
        .iter()
        .filter(|i| i.status.is_resolved())
        .map(|i| i.id)
        .collect();
    matches
        .iter()
        .filter(|m| resolved.contains(&m.lost_item) || resolved.contains(&m.found_item))
        .count()
}

/// Longest window [`items_by_date`] reports on.
pub const MAX_CHART_DAYS: u32 = 365;

/// Per-day report counts for `days` days, starting `days` days before `today`.
///
/// Items are bucketed by their reported date, not their creation time.
/// Windows longer than [`MAX_CHART_DAYS`] are cut to it.
#[must_use]
pub fn items_by_date(items: &[Item], today: NaiveDate, days: u32) -> Vec<DayCount> {
    let days = days.min(MAX_CHART_DAYS);
    let start = today
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    let mut per_day: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for item in items {
        let slot = per_day.entry(item.date).or_insert((0, 0));
        match item.item_type {
            ItemType::Lost => slot.0 += 1,
            ItemType::Found => slot.1 += 1,
        }
    }
    (0..days)
        .map(|offset| {
            let date = start + Duration::days(i64::from(offset));
            let (lost, found) = per_day.get(&date).copied().unwrap_or((0, 0));
            DayCount { date, lost, found }
        })
        .collect()
}

// =============================================================================
// STATISTICS PAGE
// =============================================================================

/// Figures for the statistics page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_items: usize,
    pub total_lost: usize,
    pub total_found: usize,
    pub total_claimed: usize,
    pub total_returned: usize,
    /// Returned items over lost reports.
    pub return_rate: Permille,
    pub categories: Vec<Tally<Category>>,
    pub status_counts: Vec<Tally<ItemStatus>>,
    pub recent_lost: Vec<Item>,
    pub recent_found: Vec<Item>,
    pub recent_claims: Vec<Claim>,
    pub items_by_date: Vec<DayCount>,
    pub top_locations: Vec<Tally<String>>,
    pub total_matches: usize,
    pub successful_matches: usize,
    pub match_success_rate: Permille,
}

/// Compute the statistics page over every item regardless of status.
#[must_use]
pub fn statistics(
    items: &[Item],
    claims: &[Claim],
    matches: &[ItemMatch],
    today: NaiveDate,
) -> Statistics {
    let total_lost = count_type(items, ItemType::Lost);
    let total_returned = count_status(items, ItemStatus::Returned);
    let successful = successful_matches(items, matches);

    let mut recent_claims: Vec<&Claim> = claims.iter().collect();
    recent_claims.sort_by(|a, b| b.claim_date.cmp(&a.claim_date).then(b.id.cmp(&a.id)));

    let mut top_locations = tally(items.iter().map(|i| i.location.clone()));
    top_locations.truncate(TOP_LOCATIONS);

    Statistics {
        total_items: items.len(),
        total_lost,
        total_found: count_type(items, ItemType::Found),
        total_claimed: count_status(items, ItemStatus::Claimed),
        total_returned,
        return_rate: Permille::ratio(total_returned, total_lost),
        categories: tally(items.iter().map(|i| i.category)),
        status_counts: tally(items.iter().map(|i| i.status)),
        recent_lost: recent_of_type(items, ItemType::Lost, RECENT_LIMIT),
        recent_found: recent_of_type(items, ItemType::Found, RECENT_LIMIT),
        recent_claims: recent_claims.into_iter().take(RECENT_LIMIT).cloned().collect(),
        items_by_date: items_by_date(items, today, CHART_DAYS),
        top_locations,
        total_matches: matches.len(),
        successful_matches: successful,
        match_success_rate: Permille::ratio(successful, matches.len()),
    }
}

// =============================================================================
// SUCCESS DASHBOARD
// =============================================================================

/// Share of all items carrying each trait that helps a report get resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessFactors {
    pub with_image: Permille,
    pub detailed_description: Permille,
    pub specific_location: Permille,
    pub quick_report: Permille,
}

/// Resolution rate within one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySuccess {
    pub category: Category,
    pub name: String,
    pub rate: Permille,
}

/// One point of the daily success chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRate {
    /// `MM/DD`.
    pub label: String,
    pub rate: Permille,
}

/// Figures for the success dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessDashboard {
    /// Claimed or returned items over lost reports.
    pub success_rate: Permille,
    pub total_returned: usize,
    pub total_matches: usize,
    pub match_success_rate: Permille,
    pub factors: SuccessFactors,
    pub category_success: Vec<CategorySuccess>,
    pub recent_matches: Vec<ItemMatch>,
    pub chart: Vec<DailyRate>,
}

/// Some line of `text` has at least `min` characters.
fn has_long_line(text: &str, min: usize) -> bool {
    text.lines().any(|line| line.chars().count() >= min)
}

/// Compute the success dashboard as of `now`.
#[must_use]
pub fn success_dashboard(
    items: &[Item],
    matches: &[ItemMatch],
    now: DateTime<Utc>,
) -> SuccessDashboard {
    let total_lost = count_type(items, ItemType::Lost);
    let resolved = items.iter().filter(|i| i.status.is_resolved()).count();
    let successful = successful_matches(items, matches);
    let denominator = items.len().max(1);

    let share = |pred: &dyn Fn(&Item) -> bool| -> Permille {
        Permille::ratio(items.iter().filter(|&i| pred(i)).count(), denominator)
    };
    let day_ago = now - Duration::days(1);
    let factors = SuccessFactors {
        with_image: share(&|i| i.image.is_some()),
        detailed_description: share(&|i| has_long_line(&i.description, DETAILED_DESCRIPTION_CHARS)),
        specific_location: share(&|i| has_long_line(&i.location, SPECIFIC_LOCATION_CHARS)),
        quick_report: share(&|i| i.created_at >= day_ago),
    };

    let category_success = Category::ALL
        .into_iter()
        .map(|category| {
            let lost = items
                .iter()
                .filter(|i| i.category == category && i.item_type == ItemType::Lost)
                .count();
            let done = items
                .iter()
                .filter(|i| i.category == category && i.status.is_resolved())
                .count();
            CategorySuccess {
                category,
                name: category.label().to_string(),
                rate: Permille::ratio(done, lost),
            }
        })
        .collect();

    let mut recent: Vec<&ItemMatch> = matches.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let start = now - Duration::days(i64::from(CHART_DAYS));
    let chart = (0..CHART_DAYS)
        .map(|offset| {
            let day = (start + Duration::days(i64::from(offset))).date_naive();
            let created_on = |i: &&Item| i.created_at.date_naive() == day;
            let day_lost = items
                .iter()
                .filter(created_on)
                .filter(|i| i.item_type == ItemType::Lost)
                .count();
            let day_done = items
                .iter()
                .filter(created_on)
                .filter(|i| i.status.is_resolved())
                .count();
            DailyRate {
                label: day.format("%m/%d").to_string(),
                rate: Permille::ratio(day_done, day_lost),
            }
        })
        .collect();

    SuccessDashboard {
        success_rate: Permille::ratio(resolved, total_lost),
        total_returned: count_status(items, ItemStatus::Returned),
        total_matches: matches.len(),
        match_success_rate: Permille::ratio(successful, matches.len()),
        factors,
        category_success,
        recent_matches: recent.into_iter().take(RECENT_MATCHES).cloned().collect(),
        chart,
    }
}

// =============================================================================
// HOME PAGE
// =============================================================================

/// Headline counters for the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickStats {
    pub total_items: usize,
    pub lost_items: usize,
    pub found_items: usize,
    /// Items created in the last seven days.
    pub recent_items: usize,
    /// Distinct matched lost items over lost reports, capped at 100%.
    pub match_coverage: Permille,
}

/// Trimmed-down item for home page cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPreview {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub item_type: ItemType,
    pub location: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A highlighted category with its approved item count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedCategory {
    pub category: Category,
    pub display_name: String,
    pub count: usize,
    /// Formatted with [`format_item_count`].
    pub count_label: String,
    pub icon: String,
}

#[must_use]
pub fn quick_stats(items: &[Item], matches: &[ItemMatch], now: DateTime<Utc>) -> QuickStats {
    let lost_items = count_type(items, ItemType::Lost);
    let week_ago = now - Duration::days(7);
    let matched_lost: BTreeSet<ItemId> = matches.iter().map(|m| m.lost_item).collect();
    QuickStats {
        total_items: items.len(),
        lost_items,
        found_items: count_type(items, ItemType::Found),
        recent_items: items.iter().filter(|i| i.created_at >= week_ago).count(),
        match_coverage: Permille::ratio(matched_lost.len(), lost_items).capped(),
    }
}

/// Cut a description down to [`PREVIEW_CHARS`] characters plus `...`.
#[must_use]
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// The newest approved items as preview cards.
#[must_use]
pub fn recent_items(items: &[Item], limit: usize) -> Vec<ItemPreview> {
    let mut approved: Vec<&Item> = items.iter().filter(|i| i.is_approved()).collect();
    sort_newest_first(&mut approved);
    approved
        .into_iter()
        .take(limit)
        .map(|item| ItemPreview {
            id: item.id,
            name: item.name.clone(),
            description: truncate_description(&item.description),
            category: item.category,
            item_type: item.item_type,
            location: item.location.clone(),
            date: item.date,
            created_at: item.created_at,
        })
        .collect()
}

#[must_use]
pub fn featured_categories(items: &[Item]) -> Vec<FeaturedCategory> {
    FEATURED_CATEGORIES
        .into_iter()
        .map(|category| {
            let count = items
                .iter()
                .filter(|i| i.category == category && i.is_approved())
                .count();
            FeaturedCategory {
                category,
                display_name: category.label().to_string(),
                count,
                count_label: format_item_count(count),
                icon: category.icon().to_string(),
            }
        })
        .collect()
}

/// `999` stays `"999"`; `1250` becomes `"1.3K"` (one decimal, half-up).
#[must_use]
pub fn format_item_count(count: usize) -> String {
    if count < 1000 {
        return count.to_string();
    }
    let tenths = (count + 50) / 100;
    format!("{}.{}K", tenths / 10, tenths % 10)
}

/// Greeting for the given hour of the day (0..=23).
#[must_use]
pub fn welcome_message(hour: u32) -> String {
    let greeting = match hour {
        5..=11 => "Good morning",
        12..=16 => "Good afternoon",
        17..=21 => "Good evening",
        _ => "Welcome",
    };
    format!("{}! Find your lost items or help others find theirs.", greeting)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemForm;
    use crate::types::{ClaimId, MatchId, MatchMethod, MatchScore, UserId};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn item(
        id: u64,
        item_type: ItemType,
        category: Category,
        status: ItemStatus,
        days_ago: i64,
    ) -> Item {
        let created = now() - Duration::days(days_ago);
        let mut item = Item::reported(
            ItemId(id),
            UserId(1),
            item_type,
            ItemForm {
                name: format!("item {}", id),
                category,
                description: "short".to_string(),
                location: "Library".to_string(),
                date: created.date_naive(),
                image: None,
                contact_info: "desk".to_string(),
            },
            created,
        );
        item.status = status;
        item
    }

    fn found_match(id: u64, lost: u64, found: u64, days_ago: i64) -> ItemMatch {
        ItemMatch {
            id: MatchId(id),
            lost_item: ItemId(lost),
            found_item: ItemId(found),
            score: MatchScore::new(80),
            method: MatchMethod::Batch,
            created_at: now() - Duration::days(days_ago),
            notified: false,
        }
    }

    fn catalog() -> Vec<Item> {
        vec![
            item(1, ItemType::Lost, Category::Electronics, ItemStatus::Approved, 10),
            item(2, ItemType::Lost, Category::Keys, ItemStatus::Returned, 5),
            item(3, ItemType::Found, Category::Electronics, ItemStatus::Claimed, 3),
            item(4, ItemType::Found, Category::Electronics, ItemStatus::Approved, 1),
            item(5, ItemType::Lost, Category::Bags, ItemStatus::Pending, 0),
        ]
    }

    #[test]
    fn permille_rounds_half_up() {
        assert_eq!(Permille::ratio(1, 3), Permille(333));
        assert_eq!(Permille::ratio(2, 3), Permille(667));
        assert_eq!(Permille::ratio(1, 8), Permille(125));
        assert_eq!(Permille::ratio(1, 0), Permille(0));
        assert_eq!(Permille::ratio(3, 2).capped(), Permille::FULL);
        assert_eq!(Permille(125).to_string(), "12.5%");
    }

    #[test]
    fn statistics_totals_and_rates() {
        let items = catalog();
        let matches = vec![found_match(1, 1, 3, 2), found_match(2, 1, 4, 1)];
        let claims = vec![Claim {
            id: ClaimId(1),
            item: ItemId(3),
            claimed_by: UserId(2),
            claim_date: now(),
            approved: true,
        }];
        let stats = statistics(&items, &claims, &matches, now().date_naive());

        assert_eq!(stats.total_items, 5);
        assert_eq!(stats.total_lost, 3);
        assert_eq!(stats.total_found, 2);
        assert_eq!(stats.total_claimed, 1);
        assert_eq!(stats.total_returned, 1);
        assert_eq!(stats.return_rate, Permille(333));
        assert_eq!(stats.categories[0].key, Category::Electronics);
        assert_eq!(stats.categories[0].count, 3);
        assert_eq!(stats.recent_lost.first().map(|i| i.id), Some(ItemId(5)));
        assert_eq!(stats.recent_claims.len(), 1);
        assert_eq!(stats.top_locations[0].key, "Library");
        assert_eq!(stats.successful_matches, 1);
        assert_eq!(stats.match_success_rate, Permille(500));
        assert_eq!(stats.items_by_date.len(), CHART_DAYS as usize);
    }

    #[test]
    fn items_by_date_buckets_report_dates() {
        let items = catalog();
        let today = now().date_naive();
        let series = items_by_date(&items, today, 7);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, today - Duration::days(7));
        // Item 2 was reported five days ago; the window ends yesterday.
        let day = series.iter().find(|d| d.date == today - Duration::days(5));
        assert_eq!(day.map(|d| d.lost), Some(1));
        assert!(series.iter().all(|d| d.date < today));
    }

    #[test]
    fn items_by_date_caps_the_window() {
        let today = now().date_naive();
        let series = items_by_date(&catalog(), today, u32::MAX);
        assert_eq!(series.len(), MAX_CHART_DAYS as usize);
        assert_eq!(series[0].date, today - Duration::days(i64::from(MAX_CHART_DAYS)));

        let near_min = NaiveDate::MIN + Duration::days(10);
        let series = items_by_date(&[], near_min, 30);
        assert_eq!(series.len(), 30);
        assert_eq!(series[0].date, NaiveDate::MIN);
    }

    #[test]
    fn success_dashboard_counts_resolved_items() {
        let mut items = catalog();
        items[0].image = Some("wallet.jpg".to_string());
        items[0].description = "x".repeat(60);
        let dashboard = success_dashboard(&items, &[found_match(1, 1, 3, 0)], now());

        // Claimed + returned over lost: 2 / 3.
        assert_eq!(dashboard.success_rate, Permille(667));
        assert_eq!(dashboard.factors.with_image, Permille(200));
        assert_eq!(dashboard.factors.detailed_description, Permille(200));
        assert_eq!(dashboard.factors.specific_location, Permille(0));
        // Created within the last day: items 4 and 5.
        assert_eq!(dashboard.factors.quick_report, Permille(400));
        let electronics = &dashboard.category_success[0];
        assert_eq!(electronics.category, Category::Electronics);
        assert_eq!(electronics.rate, Permille(1000));
        assert_eq!(dashboard.chart.len(), CHART_DAYS as usize);
        assert_eq!(dashboard.chart[0].label, "05/31");
    }

    #[test]
    fn quick_stats_coverage_is_capped() {
        let items = catalog();
        let matches = vec![found_match(1, 1, 3, 0), found_match(2, 2, 3, 0), found_match(3, 5, 4, 0)];
        let quick = quick_stats(&items, &matches, now());
        assert_eq!(quick.lost_items, 3);
        assert_eq!(quick.recent_items, 4);
        assert_eq!(quick.match_coverage, Permille::FULL);
    }

    #[test]
    fn previews_truncate_long_descriptions() {
        assert_eq!(truncate_description("short"), "short");
        let long = "a".repeat(PREVIEW_CHARS + 1);
        let cut = truncate_description(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);

        let items = catalog();
        let recent = recent_items(&items, HOME_RECENT_ITEMS);
        let ids: Vec<u64> = recent.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![4, 1]);
    }

    #[test]
    fn featured_categories_count_approved_only() {
        let featured = featured_categories(&catalog());
        assert_eq!(featured.len(), 4);
        assert_eq!(featured[0].category, Category::Electronics);
        assert_eq!(featured[0].count, 2);
        assert_eq!(featured[0].icon, "fas fa-mobile-alt");
        assert_eq!(featured[1].count, 0);
    }

    #[test]
    fn item_counts_format() {
        assert_eq!(format_item_count(999), "999");
        assert_eq!(format_item_count(1000), "1.0K");
        assert_eq!(format_item_count(1250), "1.3K");
        assert_eq!(format_item_count(15_430), "15.4K");
    }

    #[test]
    fn greeting_follows_hour() {
        assert!(welcome_message(8).starts_with("Good morning"));
        assert!(welcome_message(12).starts_with("Good afternoon"));
        assert!(welcome_message(21).starts_with("Good evening"));
        assert!(welcome_message(23).starts_with("Welcome"));
        assert!(welcome_message(4).starts_with("Welcome"));
    }
}

//! # Notify Module
//!
//! Which users should hear about what, and the text they receive.
//!
//! This module selects due notifications and renders messages. It never
//! delivers anything: the application hands rendered [`Message`]s to its
//! own notifier.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Claim, Item, ItemMatch, User};
use crate::search::sort_newest_first;
use crate::stats::{self, Permille};
use crate::types::{ItemId, ItemStatus, ItemType, MatchScore, UserId};

/// Matches younger than this are announced.
pub const MATCH_WINDOW_HOURS: i64 = 24;
/// Unclaimed items at least this old get a reminder.
pub const REMINDER_AGE_DAYS: i64 = 3;
/// Reminders sent per run.
pub const REMINDER_LIMIT: usize = 10;

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub to: UserId,
    pub email: String,
    pub subject: String,
    pub body: String,
}

/// Canonical link to an item.
#[must_use]
pub fn item_url(public_url: &str, item: ItemId) -> String {
    format!("{}/api/items/{}", public_url.trim_end_matches('/'), item)
}

// =============================================================================
// MATCH NOTIFICATIONS
// =============================================================================

/// Matches created within the last day that nobody has been told about.
#[must_use]
pub fn due_match_notifications(matches: &[ItemMatch], now: DateTime<Utc>) -> Vec<&ItemMatch> {
    let cutoff = now - Duration::hours(MATCH_WINDOW_HOURS);
    matches
        .iter()
        .filter(|m| !m.notified && m.created_at >= cutoff)
        .collect()
}

fn item_block(item: &Item) -> String {
    format!(
        "- Name: {}\n- Category: {}\n- Location: {}\n- Date: {}\n",
        item.name,
        item.category.label(),
        item.location,
        item.date
    )
}

/// Tell the owner of `own` that `other` may be the counterpart.
#[must_use]
pub fn match_message(
    recipient: &User,
    own: &Item,
    other: &Item,
    score: MatchScore,
    public_url: &str,
) -> Message {
    let kind = own.item_type.as_str();
    let subject = format!(
        "Potential Match Found for Your {} Item!",
        own.item_type.label()
    );
    let body = format!(
        "Hi {user},\n\n\
         Great news! We found a potential match for your {kind} item:\n\n\
         YOUR ITEM:\n{own}\n\
         POTENTIAL MATCH:\n{other}- Match Score: {score}\n\n\
         NEXT STEPS:\n\
         1. Review the match details: {url}\n\
         2. If this looks like your item, claim it\n\
         3. The owner will be notified and can approve your claim\n\n\
         Lost and Found Team\n",
        user = recipient.username,
        kind = kind,
        own = item_block(own),
        other = item_block(other),
        score = score,
        url = item_url(public_url, other.id),
    );
    Message {
        to: recipient.id,
        email: recipient.email.clone(),
        subject,
        body,
    }
}

// =============================================================================
// REMINDERS
// =============================================================================

/// Approved items at least three days old that nobody has claimed.
///
/// Newest first, at most [`REMINDER_LIMIT`].
#[must_use]
pub fn reminder_items<'a>(
    items: &'a [Item],
    claims: &[Claim],
    now: DateTime<Utc>,
) -> Vec<&'a Item> {
    let cutoff = now - Duration::days(REMINDER_AGE_DAYS);
    let claimed: BTreeSet<ItemId> = claims.iter().map(|c| c.item).collect();
    let mut due: Vec<&Item> = items
        .iter()
        .filter(|i| {
            i.status == ItemStatus::Approved && i.created_at <= cutoff && !claimed.contains(&i.id)
        })
        .collect();
    sort_newest_first(&mut due);
    due.truncate(REMINDER_LIMIT);
    due
}

#[must_use]
pub fn reminder_message(owner: &User, item: &Item, public_url: &str) -> Message {
    let subject = format!(
        "Reminder: Your {} Item Needs Attention",
        item.item_type.label()
    );
    let body = format!(
        "Hi {user},\n\n\
         Your {kind} item hasn't received any claims yet:\n\n\
         ITEM DETAILS:\n{details}\n\
         SUGGESTIONS TO INCREASE SUCCESS:\n\
         1. Add more details to the description\n\
         2. Add a photo if you haven't already\n\
         3. Share the link with friends: {url}\n\
         4. Check if there are similar items you can claim\n\n\
         Lost and Found Team\n",
        user = owner.username,
        kind = item.item_type.as_str(),
        details = item_block(item),
        url = item_url(public_url, item.id),
    );
    Message {
        to: owner.id,
        email: owner.email.clone(),
        subject,
        body,
    }
}

// =============================================================================
// SUCCESS METRICS
// =============================================================================

/// Summary printed at the end of a notification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessMetrics {
    /// Claimed or returned items over lost reports.
    pub success_rate: Permille,
    pub match_success_rate: Permille,
    pub total_items: usize,
    pub total_matches: usize,
    pub returned: usize,
    pub claimed: usize,
}

#[must_use]
pub fn success_metrics(items: &[Item], matches: &[ItemMatch]) -> SuccessMetrics {
    let lost = items.iter().filter(|i| i.item_type == ItemType::Lost).count();
    let returned = items
        .iter()
        .filter(|i| i.status == ItemStatus::Returned)
        .count();
    let claimed = items
        .iter()
        .filter(|i| i.status == ItemStatus::Claimed)
        .count();
    let successful = stats::successful_matches(items, matches);

    SuccessMetrics {
        success_rate: Permille::ratio(returned + claimed, lost),
        match_success_rate: Permille::ratio(successful, matches.len()),
        total_items: items.len(),
        total_matches: matches.len(),
        returned,
        claimed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemForm;
    use crate::types::{Category, ClaimId, MatchId, MatchMethod};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn user(id: u64, name: &str) -> User {
        User {
            id: UserId(id),
            username: name.to_string(),
            email: format!("{}@campus.edu", name),
            created_at: now(),
        }
    }

    fn item(id: u64, owner: u64, item_type: ItemType, days_ago: i64) -> Item {
        let created = now() - Duration::days(days_ago);
        let mut item = Item::reported(
            ItemId(id),
            UserId(owner),
            item_type,
            ItemForm {
                name: "Black Wallet".to_string(),
                category: Category::Accessories,
                description: "Leather".to_string(),
                location: "Gym".to_string(),
                date: created.date_naive(),
                image: None,
                contact_info: "desk".to_string(),
            },
            created,
        );
        item.status = ItemStatus::Approved;
        item
    }

    fn item_match(id: u64, hours_ago: i64, notified: bool) -> ItemMatch {
        ItemMatch {
            id: MatchId(id),
            lost_item: ItemId(1),
            found_item: ItemId(2),
            score: MatchScore::new(82),
            method: MatchMethod::Batch,
            created_at: now() - Duration::hours(hours_ago),
            notified,
        }
    }

    #[test]
    fn only_fresh_unnotified_matches_are_due() {
        let matches = vec![
            item_match(1, 2, false),
            item_match(2, 2, true),
            item_match(3, 25, false),
            item_match(4, 24, false),
        ];
        let due: Vec<u64> = due_match_notifications(&matches, now())
            .iter()
            .map(|m| m.id.0)
            .collect();
        assert_eq!(due, vec![1, 4]);
    }

    #[test]
    fn match_message_links_the_other_item() {
        let alice = user(1, "alice");
        let lost = item(1, 1, ItemType::Lost, 1);
        let found = item(2, 2, ItemType::Found, 1);
        let msg = match_message(&alice, &lost, &found, MatchScore::new(82), "http://lf.test/");
        assert_eq!(msg.to, UserId(1));
        assert_eq!(msg.email, "alice@campus.edu");
        assert_eq!(msg.subject, "Potential Match Found for Your Lost Item!");
        assert!(msg.body.contains("Hi alice"));
        assert!(msg.body.contains("Match Score: 82%"));
        assert!(msg.body.contains("http://lf.test/api/items/2"));
    }

    #[test]
    fn reminders_skip_claimed_and_young_items() {
        let items = vec![
            item(1, 1, ItemType::Lost, 5),
            item(2, 1, ItemType::Found, 4),
            item(3, 1, ItemType::Found, 1),
        ];
        let claims = vec![Claim {
            id: ClaimId(1),
            item: ItemId(2),
            claimed_by: UserId(2),
            claim_date: now(),
            approved: false,
        }];
        let due: Vec<u64> = reminder_items(&items, &claims, now())
            .iter()
            .map(|i| i.id.0)
            .collect();
        assert_eq!(due, vec![1]);

        let msg = reminder_message(&user(1, "alice"), &items[0], "http://lf.test");
        assert!(msg.subject.contains("Lost Item Needs Attention"));
        assert!(msg.body.contains("http://lf.test/api/items/1"));
    }

    #[test]
    fn reminders_are_capped() {
        let items: Vec<Item> = (1..=15).map(|id| item(id, 1, ItemType::Lost, 10)).collect();
        assert_eq!(reminder_items(&items, &[], now()).len(), REMINDER_LIMIT);
    }

    #[test]
    fn metrics_count_resolved_items() {
        let mut items = vec![item(1, 1, ItemType::Lost, 5), item(2, 2, ItemType::Found, 5)];
        items[1].status = ItemStatus::Claimed;
        let metrics = success_metrics(&items, &[item_match(1, 1, false)]);
        assert_eq!(metrics.success_rate, Permille(1000));
        assert_eq!(metrics.match_success_rate, Permille(1000));
        assert_eq!(metrics.claimed, 1);
        assert_eq!(metrics.returned, 0);
    }
}

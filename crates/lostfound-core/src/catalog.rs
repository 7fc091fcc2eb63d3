//! # Catalog Module
//!
//! The lifecycle service of the Lost & Found catalog.
//!
//! [`Catalog`] owns a [`Store`] and is the only place that enforces
//! ownership, visibility and status rules:
//!
//! ```text
//! report ──> Pending ──moderate──> Approved ──approve claim──> Claimed
//!               │                     │                          │
//!               └──moderate──> Rejected        mark returned ──> Returned
//! ```
//!
//! Every mutating operation ends in one [`Store::apply`]: its writes land
//! together or not at all.

use std::collections::BTreeSet;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LostFoundError, Result};
use crate::matching::{self, MatchProposal};
use crate::model::{Claim, Item, ItemForm, ItemMatch, User, clean_username};
use crate::notify::{self, Message, SuccessMetrics};
use crate::search::{self, SearchOutcome, SearchQuery, sort_newest_first};
use crate::stats::{self, FeaturedCategory, ItemPreview, QuickStats, Statistics, SuccessDashboard};
use crate::storage::{MemoryStore, Op, RecordKind, Store};
use crate::types::{
    ClaimId, ItemId, ItemStatus, ItemType, MatchId, MatchMethod, MatchScore, UserId,
};

/// Matches shown on an item page.
pub const DETAIL_MATCHES: usize = 5;
/// Same-category items shown on an item page.
pub const DETAIL_SIMILAR: usize = 6;
/// Keyword-related items shown on an item page.
pub const DETAIL_RELATED: usize = 4;
/// Items pulled per keyword when collecting related items.
const RELATED_PER_KEYWORD: usize = 3;
/// Keywords must be longer than this to find related items.
const MIN_KEYWORD_LEN: usize = 3;
/// Latest lost and found items on the home page, per type.
pub const HOME_LATEST: usize = 5;

// =============================================================================
// VIEWS
// =============================================================================

/// A moderator's decision on a reported item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Moderation {
    Approve,
    Reject,
}

impl Moderation {
    #[must_use]
    pub fn target(self) -> ItemStatus {
        match self {
            Self::Approve => ItemStatus::Approved,
            Self::Reject => ItemStatus::Rejected,
        }
    }
}

/// A new report together with the matches it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reported {
    pub item: Item,
    pub matches: Vec<ItemMatch>,
}

/// A match as seen from one of its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    pub id: MatchId,
    pub score: MatchScore,
    pub method: MatchMethod,
    pub created_at: DateTime<Utc>,
    /// The item on the other side of the match.
    pub counterpart: Item,
}

/// Everything shown on an item page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub item: Item,
    /// The viewer has reported an item of the opposite type.
    pub can_claim: bool,
    pub matches: Vec<MatchView>,
    pub similar_items: Vec<Item>,
    pub exact_related: Vec<Item>,
}

/// A user's own items and claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub user_items: Vec<Item>,
    /// Claims the user submitted.
    pub user_claims: Vec<Claim>,
    /// Claims other users made on the user's items.
    pub item_claims: Vec<Claim>,
}

/// The home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Home {
    pub welcome: String,
    pub recent_lost: Vec<Item>,
    pub recent_found: Vec<Item>,
    pub stats: QuickStats,
    pub recent_items: Vec<ItemPreview>,
    pub featured_categories: Vec<FeaturedCategory>,
}

/// What a share widget needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub item: Item,
    pub url: String,
    pub text: String,
}

/// Outcome of one batch matching pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub pairs_examined: usize,
    pub created: Vec<ItemMatch>,
}

/// Outcome of one notification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRun {
    pub match_messages: Vec<Message>,
    pub reminders: Vec<Message>,
    pub metrics: SuccessMetrics,
}

// =============================================================================
// CATALOG
// =============================================================================

/// The catalog service.
pub struct Catalog {
    store: Box<dyn Store + Send>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish()
    }
}

impl Catalog {
    #[must_use]
    pub fn new(store: Box<dyn Store + Send>) -> Self {
        Self { store }
    }

    /// A catalog on a volatile in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    pub fn user(&self, id: UserId) -> Result<User> {
        self.store
            .get_user(id)?
            .ok_or_else(|| LostFoundError::not_found(UserId::KIND, id.0))
    }

    pub fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .store
            .users()?
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username.trim())))
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.store.users()
    }

    /// Any item, whatever its status.
    pub fn item(&self, id: ItemId) -> Result<Item> {
        self.store
            .get_item(id)?
            .ok_or_else(|| LostFoundError::not_found(ItemId::KIND, id.0))
    }

    pub fn items(&self) -> Result<Vec<Item>> {
        self.store.items()
    }

    pub fn claims(&self) -> Result<Vec<Claim>> {
        self.store.claims()
    }

    /// Every match, best score first.
    pub fn matches(&self) -> Result<Vec<ItemMatch>> {
        let mut matches = self.store.matches()?;
        matches.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    /// Items waiting for moderation, oldest first.
    pub fn pending_items(&self) -> Result<Vec<Item>> {
        Ok(self
            .store
            .items()?
            .into_iter()
            .filter(|i| i.status == ItemStatus::Pending)
            .collect())
    }

    fn approved_item(&self, id: ItemId) -> Result<Item> {
        match self.store.get_item(id)? {
            Some(item) if item.is_approved() => Ok(item),
            _ => Err(LostFoundError::not_found(ItemId::KIND, id.0)),
        }
    }

    /// An item the actor owns. Other users' items look missing.
    fn owned_item(&self, actor: UserId, id: ItemId) -> Result<Item> {
        match self.store.get_item(id)? {
            Some(item) if item.is_owned_by(actor) => Ok(item),
            _ => Err(LostFoundError::not_found(ItemId::KIND, id.0)),
        }
    }

    /// A claim on one of the actor's items, with that item.
    fn claim_on_owned_item(&self, actor: UserId, id: ClaimId) -> Result<(Claim, Item)> {
        let missing = || LostFoundError::not_found(ClaimId::KIND, id.0);
        let claim = self.store.get_claim(id)?.ok_or_else(missing)?;
        match self.store.get_item(claim.item)? {
            Some(item) if item.is_owned_by(actor) => Ok((claim, item)),
            _ => Err(missing()),
        }
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Register a user. Usernames are unique, compared case-insensitively.
    pub fn register_user(&mut self, username: &str, email: &str, now: DateTime<Utc>) -> Result<User> {
        let username = clean_username(username)?;
        if self.user_by_name(&username)?.is_some() {
            return Err(LostFoundError::Conflict(format!(
                "username '{}' is taken",
                username
            )));
        }
        let id = UserId(self.store.allocate_id(RecordKind::User)?);
        let user = User {
            id,
            username,
            email: email.trim().to_string(),
            created_at: now,
        };
        self.store.apply(vec![Op::PutUser(user.clone())])?;
        Ok(user)
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Search approved items, relaxing the query when it finds nothing.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        Ok(search::search(&self.store.items()?, query))
    }

    /// Report a lost or found item. The item starts pending; matches are
    /// computed against approved items straight away.
    pub fn report_item(
        &mut self,
        owner: UserId,
        item_type: ItemType,
        form: ItemForm,
        now: DateTime<Utc>,
    ) -> Result<Reported> {
        self.user(owner)?;
        let form = form.clean()?;
        let id = ItemId(self.store.allocate_id(RecordKind::Item)?);
        let item = Item::reported(id, owner, item_type, form, now);

        let proposals = matching::report_matches(&item, &self.store.items()?);
        let matches = self.new_matches(&proposals, now)?;

        let mut ops = vec![Op::PutItem(item.clone())];
        ops.extend(matches.iter().cloned().map(Op::PutMatch));
        self.store.apply(ops)?;
        Ok(Reported { item, matches })
    }

    /// Match records for `proposals`, with fresh ids. Nothing is written.
    fn new_matches(
        &mut self,
        proposals: &[MatchProposal],
        now: DateTime<Utc>,
    ) -> Result<Vec<ItemMatch>> {
        let mut created = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let item_match = ItemMatch {
                id: MatchId(self.store.allocate_id(RecordKind::Match)?),
                lost_item: proposal.lost_item,
                found_item: proposal.found_item,
                score: proposal.score,
                method: proposal.method,
                created_at: now,
                notified: false,
            };
            created.push(item_match);
        }
        Ok(created)
    }

    /// Edit an item's fields. Only the owner may; type and status stay.
    pub fn update_item(
        &mut self,
        actor: UserId,
        id: ItemId,
        form: ItemForm,
        now: DateTime<Utc>,
    ) -> Result<Item> {
        let mut item = self.owned_item(actor, id)?;
        item.apply(form.clean()?, now);
        self.store.apply(vec![Op::PutItem(item.clone())])?;
        Ok(item)
    }

    /// Delete an item with its claims and matches. Only the owner may.
    pub fn delete_item(&mut self, actor: UserId, id: ItemId) -> Result<Item> {
        let item = self.owned_item(actor, id)?;
        let claims = self
            .store
            .claims()?
            .into_iter()
            .filter(|c| c.item == id)
            .map(|c| Op::RemoveClaim(c.id));
        let matches = self
            .store
            .matches()?
            .into_iter()
            .filter(|m| m.involves(id))
            .map(|m| Op::RemoveMatch(m.id));
        let mut ops: Vec<Op> = claims.chain(matches).collect();
        ops.push(Op::RemoveItem(id));
        self.store.apply(ops)?;
        Ok(item)
    }

    /// The item page. Only approved items are visible.
    pub fn item_detail(&self, viewer: Option<UserId>, id: ItemId) -> Result<ItemDetail> {
        let item = self.approved_item(id)?;
        let all = self.store.items()?;
        let mut approved = search::approved_newest_first(&all);
        approved.retain(|i| i.id != id && viewer.is_none_or(|v| !i.is_owned_by(v)));

        let can_claim = viewer.is_some_and(|v| {
            let wanted = item.item_type.opposite();
            all.iter()
                .any(|i| i.is_owned_by(v) && i.item_type == wanted)
        });

        let mut matches: Vec<ItemMatch> = self
            .store
            .matches()?
            .into_iter()
            .filter(|m| match item.item_type {
                ItemType::Lost => m.lost_item == id,
                ItemType::Found => m.found_item == id,
            })
            .collect();
        matches.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        let matches = matches
            .into_iter()
            .filter_map(|m| {
                let other = if m.lost_item == id {
                    m.found_item
                } else {
                    m.lost_item
                };
                all.iter().find(|i| i.id == other).map(|counterpart| MatchView {
                    id: m.id,
                    score: m.score,
                    method: m.method,
                    created_at: m.created_at,
                    counterpart: counterpart.clone(),
                })
            })
            .take(DETAIL_MATCHES)
            .collect();

        let similar_items = approved
            .iter()
            .filter(|i| i.category == item.category)
            .take(DETAIL_SIMILAR)
            .map(|i| (*i).clone())
            .collect();

        let exact_related = related_by_keyword(&item, &approved);

        Ok(ItemDetail {
            item,
            can_claim,
            matches,
            similar_items,
            exact_related,
        })
    }

    /// Any item with its canonical link and a share blurb.
    pub fn share(&self, id: ItemId, public_url: &str) -> Result<ShareLink> {
        let item = self.item(id)?;
        let text = format!(
            "{}: {} near {} on {}. Can you help?",
            item.item_type.label(),
            item.name,
            item.location,
            item.date
        );
        Ok(ShareLink {
            url: notify::item_url(public_url, item.id),
            text,
            item,
        })
    }

    // -------------------------------------------------------------------------
    // Claims
    // -------------------------------------------------------------------------

    /// Claim an approved item that belongs to someone else.
    pub fn claim_item(&mut self, actor: UserId, id: ItemId, now: DateTime<Utc>) -> Result<Claim> {
        self.user(actor)?;
        let item = self.approved_item(id)?;
        if item.is_owned_by(actor) {
            return Err(LostFoundError::Forbidden(
                "you cannot claim your own item".to_string(),
            ));
        }
        let duplicate = self
            .store
            .claims()?
            .iter()
            .any(|c| c.item == id && c.claimed_by == actor && !c.approved);
        if duplicate {
            return Err(LostFoundError::Conflict(format!(
                "you already have a pending claim on item {}",
                id
            )));
        }
        let claim = Claim {
            id: ClaimId(self.store.allocate_id(RecordKind::Claim)?),
            item: id,
            claimed_by: actor,
            claim_date: now,
            approved: false,
        };
        self.store.apply(vec![Op::PutClaim(claim.clone())])?;
        Ok(claim)
    }

    /// Accept a claim on one of the actor's items. The item becomes claimed.
    pub fn approve_claim(
        &mut self,
        actor: UserId,
        id: ClaimId,
        now: DateTime<Utc>,
    ) -> Result<Claim> {
        let (mut claim, mut item) = self.claim_on_owned_item(actor, id)?;
        if claim.approved {
            return Err(LostFoundError::InvalidTransition(format!(
                "claim {} is already approved",
                id
            )));
        }
        if item.status != ItemStatus::Approved {
            return Err(LostFoundError::InvalidTransition(format!(
                "item {} is {}, only approved items can be claimed",
                item.id, item.status
            )));
        }
        claim.approved = true;
        item.status = ItemStatus::Claimed;
        item.updated_at = now;
        self.store
            .apply(vec![Op::PutClaim(claim.clone()), Op::PutItem(item)])?;
        Ok(claim)
    }

    /// Turn down a claim on one of the actor's items. The claim is deleted.
    pub fn reject_claim(&mut self, actor: UserId, id: ClaimId) -> Result<Claim> {
        let (claim, _) = self.claim_on_owned_item(actor, id)?;
        self.store.apply(vec![Op::RemoveClaim(id)])?;
        Ok(claim)
    }

    /// Mark an item returned. Allowed for its owner and for holders of an
    /// approved claim on it.
    pub fn mark_returned(&mut self, actor: UserId, id: ItemId, now: DateTime<Utc>) -> Result<Item> {
        let mut item = self.item(id)?;
        let is_claimer = self
            .store
            .claims()?
            .iter()
            .any(|c| c.item == id && c.claimed_by == actor && c.approved);
        if !item.is_owned_by(actor) && !is_claimer {
            return Err(LostFoundError::Forbidden(
                "you don't have permission to mark this item as returned".to_string(),
            ));
        }
        item.status = ItemStatus::Returned;
        item.updated_at = now;
        self.store.apply(vec![Op::PutItem(item.clone())])?;
        Ok(item)
    }

    // -------------------------------------------------------------------------
    // Moderation and matching
    // -------------------------------------------------------------------------

    /// Approve or reject a pending (or previously rejected) item.
    pub fn moderate_item(
        &mut self,
        id: ItemId,
        decision: Moderation,
        now: DateTime<Utc>,
    ) -> Result<Item> {
        let mut item = self.item(id)?;
        let target = decision.target();
        let allowed = matches!(item.status, ItemStatus::Pending | ItemStatus::Rejected)
            && item.status != target;
        if !allowed {
            return Err(LostFoundError::InvalidTransition(format!(
                "item {} is {}, cannot move to {}",
                id, item.status, target
            )));
        }
        item.status = target;
        item.updated_at = now;
        self.store.apply(vec![Op::PutItem(item.clone())])?;
        Ok(item)
    }

    /// Pair every approved lost item with every approved found item that is
    /// not matched yet, keeping pairs at or above the batch threshold.
    pub fn run_batch_matching(&mut self, now: DateTime<Utc>) -> Result<BatchReport> {
        let items = self.store.items()?;
        let existing: BTreeSet<(ItemId, ItemId)> = self
            .store
            .matches()?
            .iter()
            .map(|m| (m.lost_item, m.found_item))
            .collect();
        let approved_ids = |t: ItemType| -> Vec<ItemId> {
            items
                .iter()
                .filter(|i| i.is_approved() && i.item_type == t)
                .map(|i| i.id)
                .collect()
        };
        let lost = approved_ids(ItemType::Lost);
        let found = approved_ids(ItemType::Found);
        let pairs_examined = lost
            .iter()
            .flat_map(|l| found.iter().map(move |f| (*l, *f)))
            .filter(|pair| !existing.contains(pair))
            .count();

        let proposals = matching::batch_matches(&items, &existing);
        let created = self.new_matches(&proposals, now)?;
        self.store
            .apply(created.iter().cloned().map(Op::PutMatch).collect())?;
        Ok(BatchReport {
            pairs_examined,
            created,
        })
    }

    /// Render and mark match notifications, then pick reminders.
    pub fn run_notifications(
        &mut self,
        now: DateTime<Utc>,
        public_url: &str,
    ) -> Result<NotificationRun> {
        let items = self.store.items()?;
        let claims = self.store.claims()?;
        let matches = self.store.matches()?;
        let find = |id: ItemId| items.iter().find(|i| i.id == id);

        let mut match_messages = Vec::new();
        let mut notified = Vec::new();
        for m in notify::due_match_notifications(&matches, now) {
            let (Some(lost), Some(found)) = (find(m.lost_item), find(m.found_item)) else {
                continue;
            };
            let lost_owner = self.user(lost.owner)?;
            let found_owner = self.user(found.owner)?;
            match_messages.push(notify::match_message(&lost_owner, lost, found, m.score, public_url));
            match_messages.push(notify::match_message(&found_owner, found, lost, m.score, public_url));
            let mut marked = m.clone();
            marked.notified = true;
            notified.push(marked);
        }

        let mut reminders = Vec::new();
        for item in notify::reminder_items(&items, &claims, now) {
            let owner = self.user(item.owner)?;
            reminders.push(notify::reminder_message(&owner, item, public_url));
        }

        let metrics = notify::success_metrics(&items, &matches);
        self.store
            .apply(notified.into_iter().map(Op::PutMatch).collect())?;
        Ok(NotificationRun {
            match_messages,
            reminders,
            metrics,
        })
    }

    // -------------------------------------------------------------------------
    // Pages
    // -------------------------------------------------------------------------

    /// The user's items and claims, newest first.
    pub fn dashboard(&self, user: UserId) -> Result<Dashboard> {
        self.user(user)?;
        let items = self.store.items()?;
        let mut own: Vec<&Item> = items.iter().filter(|i| i.is_owned_by(user)).collect();
        sort_newest_first(&mut own);
        let own_ids: BTreeSet<ItemId> = own.iter().map(|i| i.id).collect();

        let mut claims = self.store.claims()?;
        claims.sort_by(|a, b| b.claim_date.cmp(&a.claim_date).then(b.id.cmp(&a.id)));
        let user_claims = claims
            .iter()
            .filter(|c| c.claimed_by == user)
            .cloned()
            .collect();
        let item_claims = claims
            .into_iter()
            .filter(|c| own_ids.contains(&c.item))
            .collect();

        Ok(Dashboard {
            user_items: own.into_iter().cloned().collect(),
            user_claims,
            item_claims,
        })
    }

    pub fn home(&self, now: DateTime<Utc>) -> Result<Home> {
        let items = self.store.items()?;
        let matches = self.store.matches()?;
        let approved = search::approved_newest_first(&items);
        let latest = |t: ItemType| -> Vec<Item> {
            approved
                .iter()
                .filter(|i| i.item_type == t)
                .take(HOME_LATEST)
                .map(|i| (*i).clone())
                .collect()
        };
        Ok(Home {
            welcome: stats::welcome_message(now.hour()),
            recent_lost: latest(ItemType::Lost),
            recent_found: latest(ItemType::Found),
            stats: stats::quick_stats(&items, &matches, now),
            recent_items: stats::recent_items(&items, stats::HOME_RECENT_ITEMS),
            featured_categories: stats::featured_categories(&items),
        })
    }

    pub fn statistics(&self, now: DateTime<Utc>) -> Result<Statistics> {
        Ok(stats::statistics(
            &self.store.items()?,
            &self.store.claims()?,
            &self.store.matches()?,
            now.date_naive(),
        ))
    }

    pub fn success_dashboard(&self, now: DateTime<Utc>) -> Result<SuccessDashboard> {
        Ok(stats::success_dashboard(
            &self.store.items()?,
            &self.store.matches()?,
            now,
        ))
    }

    pub fn items_by_date(&self, now: DateTime<Utc>, days: u32) -> Result<Vec<stats::DayCount>> {
        Ok(stats::items_by_date(
            &self.store.items()?,
            now.date_naive(),
            days,
        ))
    }
}

/// Up to [`DETAIL_RELATED`] items sharing a longer word with `item`.
///
/// Words come from the name, then the description; each word pulls at most
/// [`RELATED_PER_KEYWORD`] candidates. `candidates` is already newest first
/// and excludes the item itself and the viewer's items.
fn related_by_keyword(item: &Item, candidates: &[&Item]) -> Vec<Item> {
    let name = item.name.to_lowercase();
    let description = item.description.to_lowercase();
    let mut related: Vec<Item> = Vec::new();

    for keyword in name.split_whitespace().chain(description.split_whitespace()) {
        if related.len() >= DETAIL_RELATED {
            break;
        }
        if keyword.chars().count() <= MIN_KEYWORD_LEN {
            continue;
        }
        let hits = candidates
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(keyword)
                    || c.description.to_lowercase().contains(keyword)
            })
            .take(RELATED_PER_KEYWORD);
        for hit in hits {
            if related.len() < DETAIL_RELATED && !related.iter().any(|r| r.id == hit.id) {
                related.push((*hit).clone());
            }
        }
    }
    related
}

// =============================================================================
// TESTS
// =============================================================================

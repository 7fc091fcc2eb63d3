//! # Matching Module
//!
//! Heuristic pairing of lost items with found items.
//!
//! Two scorers share the same 0..=100 scale:
//!
//! - [`match_score`] is the similarity scorer used by the batch matcher. It
//!   blends category equality, sequence-similarity ratios on name, description
//!   and location, and a date-proximity step function.
//! - [`quick_score`] is the containment scorer run when an item is reported.
//!
//! All arithmetic is integer. Ratios are kept as `(matched, total)` pairs and
//! only turned into points by a floor division at the very end.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::Item;
use crate::types::{ItemId, ItemType, MatchMethod, MatchScore, MAX_SCORE};

/// Points awarded for equal categories.
pub const CATEGORY_POINTS: u32 = 30;
/// Weight of the name similarity ratio.
pub const NAME_WEIGHT: u32 = 25;
/// Weight of the description similarity ratio.
pub const DESCRIPTION_WEIGHT: u32 = 20;
/// Weight of the location similarity ratio.
pub const LOCATION_WEIGHT: u32 = 15;

/// Minimum batch score for a match to be recorded.
pub const BATCH_THRESHOLD: u8 = 70;

/// Points per component of the containment scorer.
pub const QUICK_COMPONENT_POINTS: u32 = 25;
/// Days over which the containment scorer's date credit decays to zero.
pub const QUICK_DATE_WINDOW_DAYS: u32 = 30;
/// A report match is recorded only when the quick score is strictly above this.
pub const REPORT_THRESHOLD: u8 = 25;

// =============================================================================
// SEQUENCE SIMILARITY
// =============================================================================

/// Ratcliff/Obershelp similarity of two strings, kept as integers.
///
/// The ratio is `2 * matched / total`, where `matched` is the number of
/// characters in the recursively found longest matching blocks and `total`
/// the combined length of both strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Similarity {
    pub matched: usize,
    pub total: usize,
}

impl Similarity {
    /// `floor(weight * ratio)`. Two empty strings count as identical.
    #[must_use]
    pub fn points(self, weight: u32) -> u32 {
        if self.total == 0 {
            return weight;
        }
        let numerator = (self.matched as u64)
            .saturating_mul(2)
            .saturating_mul(weight as u64);
        (numerator / self.total as u64) as u32
    }

    /// Ratio as a whole percentage, floored.
    #[must_use]
    pub fn percent(self) -> u8 {
        self.points(100) as u8
    }
}

/// Second texts at least this long get the popular-character filter.
pub const POPULAR_MIN_LEN: usize = 200;

/// Compute the similarity of two strings, compared by `char`.
///
/// When `b` has at least [`POPULAR_MIN_LEN`] characters, any character
/// occurring in it more than `len / 100 + 1` times is popular: it never
/// seeds a block and is only absorbed when a block is extended. On long
/// prose this leaves little more than the rare characters to match on.
#[must_use]
pub fn similarity(a: &str, b: &str) -> Similarity {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let seeds = seed_positions(&b);
    Similarity {
        matched: matched_chars(&a, &b, &seeds),
        total: a.len().saturating_add(b.len()),
    }
}

/// `true` for every position of `b` holding a non-popular character.
fn seed_positions(b: &[char]) -> Vec<bool> {
    if b.len() < POPULAR_MIN_LEN {
        return vec![true; b.len()];
    }
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for &c in b {
        *counts.entry(c).or_default() += 1;
    }
    let limit = b.len() / 100 + 1;
    b.iter()
        .map(|c| counts.get(c).copied().unwrap_or(0) <= limit)
        .collect()
}

/// Sum of the sizes of all matching blocks.
fn matched_chars(a: &[char], b: &[char], seeds: &[bool]) -> usize {
    let mut matched = 0usize;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, seeds, (alo, ahi), (blo, bhi));
        if size == 0 {
            continue;
        }
        matched = matched.saturating_add(size);
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` built from seed
/// positions, then widened over equal characters on both ends.
///
/// Ties resolve to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    seeds: &[bool],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0usize);
    let width = bhi.saturating_sub(blo);
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];

    for (i, ca) in a.iter().enumerate().take(ahi).skip(alo) {
        for (offset, cb) in b[blo..bhi].iter().enumerate() {
            let col = offset + 1;
            if seeds[blo + offset] && ca == cb {
                let size = prev[col - 1] + 1;
                cur[col] = size;
                if size > best.2 {
                    best = (i + 1 - size, blo + col - size, size);
                }
            } else {
                cur[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let (mut i, mut j, mut size) = best;
    while i > alo && j > blo && a[i - 1] == b[j - 1] {
        i -= 1;
        j -= 1;
        size += 1;
    }
    while i + size < ahi && j + size < bhi && a[i + size] == b[j + size] {
        size += 1;
    }
    (i, j, size)
}

// =============================================================================
// BATCH SCORER
// =============================================================================

/// Step function over the absolute day distance of two reports.
#[must_use]
pub fn date_points(days_apart: u64) -> u32 {
    match days_apart {
        0..=1 => 10,
        2..=3 => 7,
        4..=7 => 5,
        8..=14 => 3,
        _ => 0,
    }
}

/// Per-component points of the similarity scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub category: u32,
    pub name: u32,
    pub description: u32,
    pub location: u32,
    pub date: u32,
    pub total: MatchScore,
}

/// Score a lost item against a found item, with the component points.
#[must_use]
pub fn score_breakdown(lost: &Item, found: &Item) -> ScoreBreakdown {
    let category = if lost.category == found.category {
        CATEGORY_POINTS
    } else {
        0
    };
    let name = lowered_similarity(&lost.name, &found.name).points(NAME_WEIGHT);
    let description =
        lowered_similarity(&lost.description, &found.description).points(DESCRIPTION_WEIGHT);
    let location = lowered_similarity(&lost.location, &found.location).points(LOCATION_WEIGHT);
    let date = date_points(days_apart(lost, found));

    let sum = category + name + description + location + date;
    ScoreBreakdown {
        category,
        name,
        description,
        location,
        date,
        total: MatchScore::new(sum.min(MAX_SCORE as u32)),
    }
}

/// Similarity score of a lost item against a found item, in `0..=100`.
#[must_use]
pub fn match_score(lost: &Item, found: &Item) -> MatchScore {
    score_breakdown(lost, found).total
}

fn lowered_similarity(a: &str, b: &str) -> Similarity {
    similarity(&a.to_lowercase(), &b.to_lowercase())
}

fn days_apart(a: &Item, b: &Item) -> u64 {
    (a.date - b.date).num_days().unsigned_abs()
}

// =============================================================================
// REPORT SCORER
// =============================================================================

/// Containment score used when an item is reported, in `0..=100`.
///
/// Name, description and location each earn 25 points when either lowercased
/// text contains the other. The date earns 25 points on the same day and
/// decays linearly to zero over 30 days.
#[must_use]
pub fn quick_score(item: &Item, candidate: &Item) -> MatchScore {
    let mut points = 0u32;
    for (a, b) in [
        (&item.name, &candidate.name),
        (&item.description, &candidate.description),
        (&item.location, &candidate.location),
    ] {
        if contains_either(a, b) {
            points += QUICK_COMPONENT_POINTS;
        }
    }
    points += quick_date_points(days_apart(item, candidate));
    MatchScore::new(points)
}

fn quick_date_points(days_apart: u64) -> u32 {
    let window = QUICK_DATE_WINDOW_DAYS as u64;
    if days_apart >= window {
        return 0;
    }
    ((QUICK_COMPONENT_POINTS as u64 * (window - days_apart)) / window) as u32
}

fn contains_either(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

// =============================================================================
// PROPOSALS
// =============================================================================

/// A match the heuristics want recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchProposal {
    pub lost_item: ItemId,
    pub found_item: ItemId,
    pub score: MatchScore,
    pub method: MatchMethod,
}

/// Matches for a newly reported item against the current catalog.
///
/// Candidates are approved items of the opposite type in the same category.
/// Proposals are oriented as (lost, found) whatever the reported type.
#[must_use]
pub fn report_matches(item: &Item, catalog: &[Item]) -> Vec<MatchProposal> {
    let wanted = item.item_type.opposite();
    catalog
        .iter()
        .filter(|c| {
            c.id != item.id && c.is_approved() && c.item_type == wanted && c.category == item.category
        })
        .filter_map(|candidate| {
            let score = quick_score(item, candidate);
            if score.value() <= REPORT_THRESHOLD {
                return None;
            }
            let (lost_item, found_item) = match item.item_type {
                ItemType::Lost => (item.id, candidate.id),
                ItemType::Found => (candidate.id, item.id),
            };
            Some(MatchProposal {
                lost_item,
                found_item,
                score,
                method: MatchMethod::Report,
            })
        })
        .collect()
}

/// Matches between every approved lost item and every approved found item.
///
/// Pairs already present in `existing` are skipped; new pairs need at least
/// [`BATCH_THRESHOLD`] points.
#[must_use]
pub fn batch_matches(
    catalog: &[Item],
    existing: &BTreeSet<(ItemId, ItemId)>,
) -> Vec<MatchProposal> {
    let lost: Vec<&Item> = catalog
        .iter()
        .filter(|i| i.is_approved() && i.item_type == ItemType::Lost)
        .collect();
    let found: Vec<&Item> = catalog
        .iter()
        .filter(|i| i.is_approved() && i.item_type == ItemType::Found)
        .collect();

    let mut proposals = Vec::new();
    for lost_item in &lost {
        for found_item in &found {
            if existing.contains(&(lost_item.id, found_item.id)) {
                continue;
            }
            let score = match_score(lost_item, found_item);
            if score.value() >= BATCH_THRESHOLD {
                proposals.push(MatchProposal {
                    lost_item: lost_item.id,
                    found_item: found_item.id,
                    score,
                    method: MatchMethod::Batch,
                });
            }
        }
    }
    proposals
}

// =============================================================================
// TESTS
// =============================================================================

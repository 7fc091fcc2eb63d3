#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use lostfound_core::matching::{batch_matches, similarity};
use lostfound_core::search::{search, SearchQuery};
use lostfound_core::{Category, Item, ItemForm, ItemId, ItemStatus, ItemType, UserId};

const NAMES: [&str; 8] = [
    "iPhone 13 Pro",
    "Red Nike Backpack",
    "Car Keys with Toyota Keychain",
    "Blue Denim Jacket",
    "Black Wallet",
    "MacBook Pro 13\"",
    "Gold Watch",
    "Student ID Card",
];

fn catalog(size: u64) -> Vec<Item> {
    let base = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).single().unwrap();
    (1..=size)
        .map(|id| {
            let name = NAMES[(id as usize) % NAMES.len()];
            let item_type = if id % 2 == 0 { ItemType::Lost } else { ItemType::Found };
            let mut item = Item::reported(
                ItemId(id),
                UserId(id % 7 + 1),
                item_type,
                ItemForm {
                    name: format!("{} #{}", name, id),
                    category: Category::ALL[(id as usize) % Category::ALL.len()],
                    description: format!("{} last seen near the main entrance", name),
                    location: format!("Building {}", id % 5),
                    date: base + Duration::days((id % 20) as i64),
                    image: None,
                    contact_info: "desk@campus.edu".to_string(),
                },
                created + Duration::minutes(id as i64),
            );
            item.status = ItemStatus::Approved;
            item
        })
        .collect()
}

fn bench_similarity(c: &mut Criterion) {
    c.bench_function("matching.similarity.description", |b| {
        b.iter(|| {
            similarity(
                "black leather wallet with student id and two credit cards",
                "found a black wallet containing cards near the library",
            )
        });
    });
}

fn bench_batch_matching(c: &mut Criterion) {
    let items = catalog(200);
    let existing = BTreeSet::new();
    c.bench_function("matching.batch.200_items", |b| {
        b.iter(|| batch_matches(&items, &existing));
    });
}

fn bench_relaxed_search(c: &mut Criterion) {
    let items = catalog(500);
    let query = SearchQuery::text("airpods case");
    c.bench_function("search.relaxed.500_items", |b| {
        b.iter(|| search(&items, &query));
    });
}

criterion_group!(benches, bench_similarity, bench_batch_matching, bench_relaxed_search);
criterion_main!(benches);

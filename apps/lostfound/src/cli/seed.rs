//! Sample data for demos and local development.
//!
//! Seeding is idempotent: the sample user is reused and an item is skipped
//! when the sample user already reported one with the same name.

use chrono::{DateTime, Utc};
use lostfound_core::{Catalog, Category, ItemForm, ItemType, Moderation, Result};

pub const SAMPLE_USERNAME: &str = "testuser";
pub const SAMPLE_EMAIL: &str = "test@example.com";

struct SampleItem {
    name: &'static str,
    category: Category,
    item_type: ItemType,
    description: &'static str,
    location: &'static str,
    contact_info: &'static str,
}

const SAMPLE_ITEMS: [SampleItem; 8] = [
    SampleItem {
        name: "iPhone 13 Pro",
        category: Category::Electronics,
        item_type: ItemType::Lost,
        description: "Black iPhone 13 Pro with blue protective case. Has a small scratch on the back corner.",
        location: "University Library - 2nd Floor",
        contact_info: "john.doe@email.com",
    },
    SampleItem {
        name: "Red Nike Backpack",
        category: Category::Bags,
        item_type: ItemType::Found,
        description: "Red Nike backpack with laptop compartment. Contains some textbooks and a water bottle.",
        location: "Campus Cafeteria",
        contact_info: "jane.smith@email.com",
    },
    SampleItem {
        name: "Car Keys with Toyota Keychain",
        category: Category::Keys,
        item_type: ItemType::Lost,
        description: "Set of car keys with black Toyota keychain and house keys attached.",
        location: "Parking Lot B",
        contact_info: "mike.wilson@email.com",
    },
    SampleItem {
        name: "Blue Denim Jacket",
        category: Category::Clothing,
        item_type: ItemType::Found,
        description: "Blue denim jacket, size M, with small tear on left sleeve.",
        location: "Student Center",
        contact_info: "sarah.jones@email.com",
    },
    SampleItem {
        name: "Black Wallet",
        category: Category::Accessories,
        item_type: ItemType::Found,
        description: "Black leather wallet with credit cards and ID inside.",
        location: "Gym Locker Room",
        contact_info: "alex.brown@email.com",
    },
    SampleItem {
        name: "MacBook Pro 13\"",
        category: Category::Electronics,
        item_type: ItemType::Lost,
        description: "Silver MacBook Pro 13 inch with stickers on the back.",
        location: "Computer Lab",
        contact_info: "lisa.davis@email.com",
    },
    SampleItem {
        name: "Gold Watch",
        category: Category::Accessories,
        item_type: ItemType::Found,
        description: "Gold-colored wristwatch with brown leather strap.",
        location: "Basketball Court",
        contact_info: "tom.garcia@email.com",
    },
    SampleItem {
        name: "Student ID Card",
        category: Category::Documents,
        item_type: ItemType::Found,
        description: "Student ID card for Maria Rodriguez, expires 2025.",
        location: "Main Entrance",
        contact_info: "security@university.edu",
    },
];

/// What a seeding pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub user_created: bool,
    pub items_created: usize,
    pub items_skipped: usize,
    pub matches_created: usize,
}

/// Add the sample user and the approved sample items dated `now`.
pub fn seed(catalog: &mut Catalog, now: DateTime<Utc>) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let user = match catalog.user_by_name(SAMPLE_USERNAME)? {
        Some(user) => user,
        None => {
            report.user_created = true;
            catalog.register_user(SAMPLE_USERNAME, SAMPLE_EMAIL, now)?
        }
    };

    let existing: Vec<String> = catalog
        .items()?
        .into_iter()
        .filter(|i| i.is_owned_by(user.id))
        .map(|i| i.name)
        .collect();

    for sample in &SAMPLE_ITEMS {
        if existing.iter().any(|name| name == sample.name) {
            report.items_skipped += 1;
            continue;
        }
        let form = ItemForm {
            name: sample.name.to_string(),
            category: sample.category,
            description: sample.description.to_string(),
            location: sample.location.to_string(),
            date: now.date_naive(),
            image: None,
            contact_info: sample.contact_info.to_string(),
        };
        let reported = catalog.report_item(user.id, sample.item_type, form, now)?;
        catalog.moderate_item(reported.item.id, Moderation::Approve, now)?;
        report.items_created += 1;
        report.matches_created += reported.matches.len();
    }
    Ok(report)
}

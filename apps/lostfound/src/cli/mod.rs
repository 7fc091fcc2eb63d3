//! # CLI Commands
//!
//! One function per `lostfound` subcommand. Commands open the database,
//! run one catalog operation, print a human summary and return a result
//! the binary turns into an exit code. Time-dependent commands take `now`
//! so tests can pin the clock.

pub mod seed;

use std::path::Path;

use chrono::{DateTime, Utc};
use lostfound_core::search::PAGE_SIZE;
use lostfound_core::{Backend, Catalog, Item, SearchQuery, Statistics, open_store, paginate};
use tracing::{debug, info};

use crate::notifier::{Delivered, Notifier, deliver_run};
pub use seed::SeedReport;

// =============================================================================
// DATABASE
// =============================================================================

/// Parse a `--backend` value.
pub fn parse_backend(backend: &str) -> Result<Backend, String> {
    backend.parse().map_err(|e| format!("{}", e))
}

/// Create an empty database at `db_path`.
///
/// Fails when the path exists unless `force` is set, in which case the old
/// database is removed first.
pub fn cmd_init(db_path: &Path, backend: &str, force: bool) -> Result<(), String> {
    let backend = parse_backend(backend)?;
    if db_path.exists() {
        if !force {
            return Err(format!(
                "Database already exists at {}. Use --force to overwrite.",
                db_path.display()
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| format!("Failed to remove {}: {}", db_path.display(), e))?;
    }
    let mut store = open_store(db_path, backend)
        .map_err(|e| format!("Failed to create database: {}", e))?;
    store
        .flush()
        .map_err(|e| format!("Failed to write database: {}", e))?;

    info!(path = %db_path.display(), %backend, "database initialised");
    println!("Initialized {} database at {}", backend, db_path.display());
    Ok(())
}

/// Open an existing database as a [`Catalog`].
pub fn open_catalog(db_path: &Path, backend: &str) -> Result<Catalog, String> {
    let backend = parse_backend(backend)?;
    if !db_path.exists() {
        return Err(format!(
            "No database at {}. Run `lostfound init` first.",
            db_path.display()
        ));
    }
    let store = open_store(db_path, backend)
        .map_err(|e| format!("Failed to open database {}: {}", db_path.display(), e))?;
    Ok(Catalog::new(store))
}

// =============================================================================
// SEED
// =============================================================================

/// Load the sample user and items.
pub fn cmd_seed(db_path: &Path, backend: &str, now: DateTime<Utc>) -> Result<SeedReport, String> {
    let mut catalog = open_catalog(db_path, backend)?;
    let report = seed::seed(&mut catalog, now).map_err(|e| format!("Seeding failed: {}", e))?;

    info!(
        items_created = report.items_created,
        items_skipped = report.items_skipped,
        "sample data loaded"
    );
    if report.user_created {
        println!("Created user '{}'", seed::SAMPLE_USERNAME);
    }
    println!(
        "Created {} sample items ({} already present, {} matches)",
        report.items_created, report.items_skipped, report.matches_created
    );
    Ok(report)
}

// =============================================================================
// MATCH
// =============================================================================

/// What `lostfound match` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSummary {
    pub pairs_examined: usize,
    pub matches_created: usize,
    /// Present when notifications were requested.
    pub delivered: Option<Delivered>,
}

/// Run batch matching and, with `notify`, the notification pass.
pub fn cmd_match(
    db_path: &Path,
    backend: &str,
    notify: Option<(&dyn Notifier, &str)>,
    now: DateTime<Utc>,
) -> Result<MatchSummary, String> {
    let mut catalog = open_catalog(db_path, backend)?;
    let batch = catalog
        .run_batch_matching(now)
        .map_err(|e| format!("Matching failed: {}", e))?;

    info!(
        pairs = batch.pairs_examined,
        created = batch.created.len(),
        "batch matching finished"
    );
    println!(
        "Examined {} pairs, created {} matches",
        batch.pairs_examined,
        batch.created.len()
    );
    for m in &batch.created {
        println!(
            "  match #{}: lost #{} <-> found #{} ({})",
            m.id, m.lost_item, m.found_item, m.score
        );
    }

    let delivered = match notify {
        Some((notifier, public_url)) => {
            let run = catalog
                .run_notifications(now, public_url)
                .map_err(|e| format!("Notification run failed: {}", e))?;
            let delivered = deliver_run(notifier, &run);
            println!(
                "Sent {} match notifications and {} reminders ({} failed)",
                delivered.matches, delivered.reminders, delivered.failed
            );
            println!(
                "Success rate {}, match success rate {}, {} items, {} matches",
                run.metrics.success_rate,
                run.metrics.match_success_rate,
                run.metrics.total_items,
                run.metrics.total_matches
            );
            Some(delivered)
        }
        None => None,
    };

    Ok(MatchSummary {
        pairs_examined: batch.pairs_examined,
        matches_created: batch.created.len(),
        delivered,
    })
}

// =============================================================================
// STATS
// =============================================================================

/// Print the statistics page, as text or JSON.
pub fn cmd_stats(
    db_path: &Path,
    backend: &str,
    json: bool,
    now: DateTime<Utc>,
) -> Result<String, String> {
    let catalog = open_catalog(db_path, backend)?;
    let stats = catalog
        .statistics(now)
        .map_err(|e| format!("Failed to compute statistics: {}", e))?;
    let output = if json {
        serde_json::to_string_pretty(&stats).map_err(|e| format!("JSON error: {}", e))?
    } else {
        render_stats(&stats)
    };
    println!("{}", output);
    Ok(output)
}

fn render_stats(stats: &Statistics) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total items:     {}\n", stats.total_items));
    out.push_str(&format!("  lost:          {}\n", stats.total_lost));
    out.push_str(&format!("  found:         {}\n", stats.total_found));
    out.push_str(&format!("  claimed:       {}\n", stats.total_claimed));
    out.push_str(&format!("  returned:      {}\n", stats.total_returned));
    out.push_str(&format!("Return rate:     {}\n", stats.return_rate));
    out.push_str(&format!(
        "Matches:         {} ({} successful, {})\n",
        stats.total_matches, stats.successful_matches, stats.match_success_rate
    ));
    if !stats.categories.is_empty() {
        out.push_str("Categories:\n");
        for tally in &stats.categories {
            out.push_str(&format!("  {:<14} {}\n", tally.key.label(), tally.count));
        }
    }
    if !stats.top_locations.is_empty() {
        out.push_str("Top locations:\n");
        for tally in &stats.top_locations {
            out.push_str(&format!("  {:<30} {}\n", tally.key, tally.count));
        }
    }
    out.trim_end().to_string()
}

// =============================================================================
// SEARCH
// =============================================================================

/// Search approved items, relaxing the query when it finds nothing.
pub fn cmd_search(
    db_path: &Path,
    backend: &str,
    query: &SearchQuery,
    page: Option<&str>,
) -> Result<String, String> {
    let catalog = open_catalog(db_path, backend)?;
    let outcome = catalog
        .search(query)
        .map_err(|e| format!("Search failed: {}", e))?;
    debug!(tier = ?outcome.tier, rows = outcome.items.len(), "search finished");

    let page = paginate(outcome.items, page, PAGE_SIZE);
    let mut out = String::new();
    if outcome.performed && outcome.tier.is_relaxed() {
        out.push_str(&format!(
            "No exact results; showing {}\n",
            outcome.tier.describe()
        ));
    }
    out.push_str(&format!(
        "{} results (page {} of {}, {} approved items in total)\n",
        page.total, page.number, page.num_pages, outcome.total_items
    ));
    for item in &page.items {
        out.push_str(&render_item_line(item));
        out.push('\n');
    }
    let out = out.trim_end().to_string();
    println!("{}", out);
    Ok(out)
}

fn render_item_line(item: &Item) -> String {
    format!(
        "#{} [{}] {} ({}) at {} on {}",
        item.id,
        item.item_type.label(),
        item.name,
        item.category.label(),
        item.location,
        item.date
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_parse() {
        assert_eq!(parse_backend("file"), Ok(Backend::File));
        assert_eq!(parse_backend("redb"), Ok(Backend::Redb));
        assert!(parse_backend("sqlite").is_err());
    }
}

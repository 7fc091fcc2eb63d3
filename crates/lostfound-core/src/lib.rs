//! # Lost & Found Core
//!
//! The catalog engine of the Lost & Found service.
//!
//! This crate owns every rule of the system and nothing else:
//! - Records and their validation ([`model`], [`types`])
//! - Lost/found pairing heuristics ([`matching`])
//! - Search with progressive query relaxation ([`search`])
//! - Lifecycle, ownership and moderation rules ([`catalog`])
//! - Analytics and home page figures ([`stats`])
//! - Notification selection and rendering ([`notify`])
//! - Persistence behind the [`Store`] trait ([`storage`], [`formats`])
//!
//! The crate is synchronous and never reads the clock: operations that
//! depend on time take `now` or `today`. Scores and rates are integers.

pub mod catalog;
pub mod error;
pub mod formats;
pub mod matching;
pub mod model;
pub mod notify;
pub mod search;
pub mod stats;
pub mod storage;
pub mod types;

pub use catalog::{
    BatchReport, Catalog, Dashboard, Home, ItemDetail, MatchView, Moderation, NotificationRun,
    Reported, ShareLink,
};
pub use error::{LostFoundError, Result};
pub use matching::{MatchProposal, ScoreBreakdown, match_score, quick_score, score_breakdown};
pub use model::{Claim, Item, ItemForm, ItemMatch, User};
pub use notify::{Message, SuccessMetrics};
pub use search::{Page, SearchOutcome, SearchQuery, SearchTier, paginate};
pub use stats::{Permille, Statistics, SuccessDashboard};
pub use storage::{Backend, MemoryStore, Op, RedbStore, Store, open_store};
pub use types::{
    Category, ClaimId, ItemId, ItemStatus, ItemType, MatchId, MatchMethod, MatchScore, UserId,
};

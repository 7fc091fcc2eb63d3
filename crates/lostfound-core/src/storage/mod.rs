//! # Storage Module
//!
//! Record persistence behind the [`Store`] trait.
//!
//! Two backends:
//! - [`MemoryStore`]: `BTreeMap` tables, optionally saved to a snapshot file
//!   on [`Store::flush`]
//! - [`RedbStore`]: one redb table per record kind (ACID, crash safe)
//!
//! Stores are dumb tables. Filtering, ordering and every lifecycle rule live
//! in the catalog layer.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use std::fmt;
use std::str::FromStr;

use crate::error::{LostFoundError, Result};
use crate::model::{Claim, Item, ItemMatch, User};
use crate::types::{ClaimId, ItemId, MatchId, UserId};

/// The record kinds that own an id sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordKind {
    User,
    Item,
    Claim,
    Match,
}

impl RecordKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Item => "item",
            Self::Claim => "claim",
            Self::Match => "match",
        }
    }
}

/// One write of a batch handed to [`Store::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    PutUser(User),
    PutItem(Item),
    RemoveItem(ItemId),
    PutClaim(Claim),
    RemoveClaim(ClaimId),
    PutMatch(ItemMatch),
    RemoveMatch(MatchId),
}

/// Table storage for the four record kinds.
///
/// Lists come back in id order. Writes only happen through [`Store::apply`]:
/// a batch lands completely and durably, or not at all. Removing a record
/// that does not exist is not an error.
pub trait Store {
    /// Hand out the next id for a record kind. Ids are never reused, even
    /// when the batch that was meant to use them fails.
    fn allocate_id(&mut self, kind: RecordKind) -> Result<u64>;

    fn get_user(&self, id: UserId) -> Result<Option<User>>;
    fn users(&self) -> Result<Vec<User>>;

    fn get_item(&self, id: ItemId) -> Result<Option<Item>>;
    fn items(&self) -> Result<Vec<Item>>;

    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>>;
    fn claims(&self) -> Result<Vec<Claim>>;

    fn matches(&self) -> Result<Vec<ItemMatch>>;

    /// Apply every op in order as one atomic, durable write.
    fn apply(&mut self, ops: Vec<Op>) -> Result<()>;

    /// Persist the store as it is, creating its file if needed.
    fn flush(&mut self) -> Result<()>;
}

/// Which backend a database path uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Snapshot file loaded into a [`MemoryStore`].
    File,
    /// redb database file.
    Redb,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Redb => f.write_str("redb"),
        }
    }
}

impl FromStr for Backend {
    type Err = LostFoundError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(Self::File),
            "redb" => Ok(Self::Redb),
            other => Err(LostFoundError::Validation(format!(
                "unknown backend '{}', expected 'file' or 'redb'",
                other
            ))),
        }
    }
}

/// Open (or create) a store at `path` with the given backend.
pub fn open_store(path: &std::path::Path, backend: Backend) -> Result<Box<dyn Store + Send>> {
    match backend {
        Backend::File => Ok(Box::new(MemoryStore::open(path)?)),
        Backend::Redb => Ok(Box::new(RedbStore::open(path)?)),
    }
}

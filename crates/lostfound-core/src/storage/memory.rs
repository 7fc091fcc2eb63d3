//! In-memory tables with optional snapshot-file persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Op, RecordKind, Store};
use crate::error::Result;
use crate::formats::{decode_snapshot, encode_snapshot, Counters, Snapshot};
use crate::model::{Claim, Item, ItemMatch, User};
use crate::types::{ClaimId, ItemId, MatchId, UserId};

/// `BTreeMap`-backed store.
///
/// With a backing path, [`Store::flush`] rewrites the snapshot file
/// atomically (write to a sibling temp file, then rename).
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: Counters,
    users: BTreeMap<UserId, User>,
    items: BTreeMap<ItemId, Item>,
    claims: BTreeMap<ClaimId, Claim>,
    matches: BTreeMap<MatchId, ItemMatch>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// A volatile store with no backing file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the snapshot at `path`, or start empty if the file is missing.
    pub fn open(path: &Path) -> Result<Self> {
        let mut store = if path.exists() {
            let bytes = std::fs::read(path)?;
            Self::from_snapshot(decode_snapshot(&bytes)?)
        } else {
            Self::new()
        };
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Rebuild tables from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            counters: snapshot.counters,
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            items: snapshot.items.into_iter().map(|i| (i.id, i)).collect(),
            claims: snapshot.claims.into_iter().map(|c| (c.id, c)).collect(),
            matches: snapshot.matches.into_iter().map(|m| (m.id, m)).collect(),
            path: None,
        }
    }

    /// Copy every table into a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            counters: self.counters,
            users: self.users.values().cloned().collect(),
            items: self.items.values().cloned().collect(),
            claims: self.claims.values().cloned().collect(),
            matches: self.matches.values().cloned().collect(),
        }
    }

    /// Write the snapshot to `path` regardless of the backing path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let bytes = encode_snapshot(&self.snapshot())?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Prior state of one record touched by a batch.
enum Undo {
    User(UserId, Option<User>),
    Item(ItemId, Option<Item>),
    Claim(ClaimId, Option<Claim>),
    Match(MatchId, Option<ItemMatch>),
}

fn restore<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, prior: Option<V>) {
    match prior {
        Some(value) => {
            table.insert(key, value);
        }
        None => {
            table.remove(&key);
        }
    }
}

impl MemoryStore {
    fn write(&mut self, op: Op) -> Undo {
        match op {
            Op::PutUser(user) => Undo::User(user.id, self.users.insert(user.id, user)),
            Op::PutItem(item) => Undo::Item(item.id, self.items.insert(item.id, item)),
            Op::RemoveItem(id) => Undo::Item(id, self.items.remove(&id)),
            Op::PutClaim(claim) => Undo::Claim(claim.id, self.claims.insert(claim.id, claim)),
            Op::RemoveClaim(id) => Undo::Claim(id, self.claims.remove(&id)),
            Op::PutMatch(m) => Undo::Match(m.id, self.matches.insert(m.id, m)),
            Op::RemoveMatch(id) => Undo::Match(id, self.matches.remove(&id)),
        }
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::User(id, prior) => restore(&mut self.users, id, prior),
            Undo::Item(id, prior) => restore(&mut self.items, id, prior),
            Undo::Claim(id, prior) => restore(&mut self.claims, id, prior),
            Undo::Match(id, prior) => restore(&mut self.matches, id, prior),
        }
    }
}

impl Store for MemoryStore {
    fn allocate_id(&mut self, kind: RecordKind) -> Result<u64> {
        let slot = match kind {
            RecordKind::User => &mut self.counters.user,
            RecordKind::Item => &mut self.counters.item,
            RecordKind::Claim => &mut self.counters.claim,
            RecordKind::Match => &mut self.counters.item_match,
        };
        let id = *slot;
        *slot = slot.saturating_add(1);
        Ok(id)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).cloned())
    }

    fn users(&self) -> Result<Vec<User>> {
        Ok(self.users.values().cloned().collect())
    }

    fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.items.get(&id).cloned())
    }

    fn items(&self) -> Result<Vec<Item>> {
        Ok(self.items.values().cloned().collect())
    }

    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>> {
        Ok(self.claims.get(&id).cloned())
    }

    fn claims(&self) -> Result<Vec<Claim>> {
        Ok(self.claims.values().cloned().collect())
    }

    fn matches(&self) -> Result<Vec<ItemMatch>> {
        Ok(self.matches.values().cloned().collect())
    }

    /// Tables change in place; if the snapshot cannot be written they are
    /// put back as they were.
    fn apply(&mut self, ops: Vec<Op>) -> Result<()> {
        let undo: Vec<Undo> = ops.into_iter().map(|op| self.write(op)).collect();
        if let Err(e) = self.flush() {
            for step in undo.into_iter().rev() {
                self.undo(step);
            }
            return Err(e);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }
}

//! redb-backed store.
//!
//! Every record kind gets its own `u64 -> bytes` table holding postcard
//! records; id sequences live in a `counters` table. A batch from
//! [`Store::apply`] is one write transaction, so [`Store::flush`] has
//! nothing left to do.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Op, RecordKind, Store};
use crate::error::{LostFoundError, Result};
use crate::formats::{decode_record, encode_record};
use crate::model::{Claim, Item, ItemMatch, User};
use crate::types::{ClaimId, ItemId, MatchId, UserId};

type RecordTable = TableDefinition<'static, u64, &'static [u8]>;

const USERS: RecordTable = TableDefinition::new("users");
const ITEMS: RecordTable = TableDefinition::new("items");
const CLAIMS: RecordTable = TableDefinition::new("claims");
const MATCHES: RecordTable = TableDefinition::new("matches");
const COUNTERS: TableDefinition<'static, &'static str, u64> = TableDefinition::new("counters");

fn storage_err(err: impl Into<redb::Error>) -> LostFoundError {
    LostFoundError::from(err.into())
}

/// Disk-backed store on a single redb file.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish()
    }
}

impl RedbStore {
    /// Open or create the database and make sure every table exists.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(storage_err)?;
        let txn = db.begin_write().map_err(storage_err)?;
        {
            for table in [USERS, ITEMS, CLAIMS, MATCHES] {
                txn.open_table(table).map_err(storage_err)?;
            }
            txn.open_table(COUNTERS).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(Self { db })
    }

    fn get<T: DeserializeOwned>(&self, table: RecordTable, key: u64) -> Result<Option<T>> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let t = txn.open_table(table).map_err(storage_err)?;
        match t.get(key).map_err(storage_err)? {
            Some(guard) => Ok(Some(decode_record(guard.value())?)),
            None => Ok(None),
        }
    }

    fn list<T: DeserializeOwned>(&self, table: RecordTable) -> Result<Vec<T>> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let t = txn.open_table(table).map_err(storage_err)?;
        let mut out = Vec::new();
        for entry in t.iter().map_err(storage_err)? {
            let (_key, value) = entry.map_err(storage_err)?;
            out.push(decode_record(value.value())?);
        }
        Ok(out)
    }
}

fn put<T: Serialize>(txn: &WriteTransaction, table: RecordTable, key: u64, record: &T) -> Result<()> {
    let bytes = encode_record(record)?;
    let mut t = txn.open_table(table).map_err(storage_err)?;
    t.insert(key, bytes.as_slice()).map_err(storage_err)?;
    Ok(())
}

fn remove(txn: &WriteTransaction, table: RecordTable, key: u64) -> Result<()> {
    let mut t = txn.open_table(table).map_err(storage_err)?;
    t.remove(key).map_err(storage_err)?;
    Ok(())
}

impl Store for RedbStore {
    fn allocate_id(&mut self, kind: RecordKind) -> Result<u64> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        let id = {
            let mut t = txn.open_table(COUNTERS).map_err(storage_err)?;
            let next = t
                .get(kind.as_str())
                .map_err(storage_err)?
                .map(|g| g.value())
                .unwrap_or(1);
            t.insert(kind.as_str(), next.saturating_add(1))
                .map_err(storage_err)?;
            next
        };
        txn.commit().map_err(storage_err)?;
        Ok(id)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.get(USERS, id.0)
    }

    fn users(&self) -> Result<Vec<User>> {
        self.list(USERS)
    }

    fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        self.get(ITEMS, id.0)
    }

    fn items(&self) -> Result<Vec<Item>> {
        self.list(ITEMS)
    }

    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>> {
        self.get(CLAIMS, id.0)
    }

    fn claims(&self) -> Result<Vec<Claim>> {
        self.list(CLAIMS)
    }

    fn matches(&self) -> Result<Vec<ItemMatch>> {
        self.list(MATCHES)
    }

    /// Dropping the transaction on an error aborts it, so nothing from a
    /// failed batch reaches the file.
    fn apply(&mut self, ops: Vec<Op>) -> Result<()> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        for op in &ops {
            match op {
                Op::PutUser(user) => put(&txn, USERS, user.id.0, user)?,
                Op::PutItem(item) => put(&txn, ITEMS, item.id.0, item)?,
                Op::RemoveItem(id) => remove(&txn, ITEMS, id.0)?,
                Op::PutClaim(claim) => put(&txn, CLAIMS, claim.id.0, claim)?,
                Op::RemoveClaim(id) => remove(&txn, CLAIMS, id.0)?,
                Op::PutMatch(m) => put(&txn, MATCHES, m.id.0, m)?,
                Op::RemoveMatch(id) => remove(&txn, MATCHES, id.0)?,
            }
        }
        txn.commit().map_err(storage_err)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchMethod, MatchScore};
    use chrono::Utc;

    fn item_match(id: u64) -> ItemMatch {
        ItemMatch {
            id: MatchId(id),
            lost_item: ItemId(1),
            found_item: ItemId(2),
            score: MatchScore::new(80),
            method: MatchMethod::Batch,
            created_at: Utc::now(),
            notified: false,
        }
    }

    #[test]
    fn redb_roundtrip_and_counters() {
        let Ok(dir) = tempfile::tempdir() else { return };
        let path = dir.path().join("catalog.redb");

        {
            let store = RedbStore::open(&path);
            assert!(store.is_ok());
            let Ok(mut store) = store else { return };
            assert_eq!(store.allocate_id(RecordKind::Match), Ok(1));
            assert!(store.apply(vec![Op::PutMatch(item_match(1))]).is_ok());
            assert_eq!(store.matches().map(|v| v.len()), Ok(1));
        }

        let Ok(mut reopened) = RedbStore::open(&path) else { return };
        assert_eq!(reopened.allocate_id(RecordKind::Match), Ok(2));
        assert!(reopened.apply(vec![Op::RemoveMatch(MatchId(1))]).is_ok());
        assert_eq!(reopened.matches().map(|v| v.len()), Ok(0));
        // Removing a missing record is fine.
        assert!(reopened.apply(vec![Op::RemoveMatch(MatchId(1))]).is_ok());
    }

    #[test]
    fn batch_applies_in_order() {
        let Ok(dir) = tempfile::tempdir() else { return };
        let Ok(mut store) = RedbStore::open(&dir.path().join("batch.redb")) else {
            return;
        };
        let mut notified = item_match(1);
        notified.notified = true;
        let batch = vec![
            Op::PutMatch(item_match(1)),
            Op::PutMatch(item_match(2)),
            Op::RemoveMatch(MatchId(2)),
            Op::PutMatch(notified.clone()),
        ];
        assert!(store.apply(batch).is_ok());
        assert_eq!(store.matches(), Ok(vec![notified]));
    }
}

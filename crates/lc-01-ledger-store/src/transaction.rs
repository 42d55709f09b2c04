//! # Transactions
//!
//! A [`DbTransaction`] is one logical ledger operation: a RocksDB snapshot
//! plus a buffered write set. Reads consult the write set first, then the
//! snapshot, so a transaction always sees its own prior writes on a
//! consistent view. Nothing touches disk until `commit`, which flushes the
//! whole set as a single atomic batch; a failed commit poisons nothing on
//! disk and the caller retries the logical operation.
//!
//! Iterators merge the snapshot with the write set in key order, in both
//! directions. Range deletes materialise tombstones for every snapshot key in
//! range so merged reads stay exact.

use crate::columns::Column;
use crate::database::Database;
use crate::errors::StoreError;
use rocksdb::{Direction, IteratorMode, WriteBatch, WriteOptions};
use std::collections::BTreeMap;

/// A key/value pair yielded by iteration.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Counter key namespace inside the `prop` column.
const COUNTER_PREFIX: &[u8] = b"cnt:";

/// One logical ledger operation over a consistent snapshot.
pub struct DbTransaction<'db> {
    db: &'db Database,
    snapshot: rocksdb::Snapshot<'db>,
    /// Latest buffered operation per key; `None` is a tombstone.
    writes: BTreeMap<Column, BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    /// Range deletes in request order, replayed ahead of point operations.
    range_deletes: Vec<(Column, Vec<u8>, Vec<u8>)>,
}

impl<'db> DbTransaction<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            snapshot: db.inner().snapshot(),
            writes: BTreeMap::new(),
            range_deletes: Vec::new(),
        }
    }

    /// Read a key, seeing this transaction's own prior writes.
    pub fn get(&self, col: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(op) = self.writes.get(&col).and_then(|m| m.get(key)) {
            return Ok(op.clone());
        }
        let cf = self.db.cf(col)?;
        Ok(self.snapshot.get_cf(cf, key)?)
    }

    /// True iff the key is visible to this transaction.
    pub fn exists(&self, col: Column, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(col, key)?.is_some())
    }

    /// Buffer a write.
    pub fn put(&mut self, col: Column, key: &[u8], value: &[u8]) {
        self.writes
            .entry(col)
            .or_default()
            .insert(key.to_vec(), Some(value.to_vec()));
    }

    /// Buffer a point delete.
    pub fn del(&mut self, col: Column, key: &[u8]) {
        self.writes
            .entry(col)
            .or_default()
            .insert(key.to_vec(), None);
    }

    /// Delete every key in `[lo, hi)`.
    pub fn del_range(&mut self, col: Column, lo: &[u8], hi: &[u8]) -> Result<(), StoreError> {
        let overlay = self.writes.entry(col).or_default();
        let doomed: Vec<Vec<u8>> = overlay
            .range(lo.to_vec()..hi.to_vec())
            .map(|(k, _)| k.clone())
            .collect();
        for key in doomed {
            overlay.remove(&key);
        }
        // tombstone every snapshot key in range so merged reads stay exact
        let cf = self.db.cf(col)?;
        let iter = self
            .snapshot
            .iterator_cf(cf, IteratorMode::From(lo, Direction::Forward));
        let mut tombstones = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if key.as_ref() >= hi {
                break;
            }
            tombstones.push(key.to_vec());
        }
        let overlay = self.writes.entry(col).or_default();
        for key in tombstones {
            overlay.insert(key, None);
        }
        self.range_deletes.push((col, lo.to_vec(), hi.to_vec()));
        Ok(())
    }

    /// Forward iterator starting at the first key `>= from` (or the column
    /// start), merged with this transaction's writes.
    pub fn forward_iter<'a>(
        &'a self,
        col: Column,
        from: Option<&[u8]>,
    ) -> Result<DbIter<'a>, StoreError> {
        let cf = self.db.cf(col)?;
        let mode = match from {
            Some(key) => IteratorMode::From(key, Direction::Forward),
            None => IteratorMode::Start,
        };
        let snap = self.snapshot.iterator_cf(cf, mode);
        let overlay: Vec<(Vec<u8>, Option<Vec<u8>>)> = match self.writes.get(&col) {
            Some(map) => match from {
                Some(key) => map
                    .range(key.to_vec()..)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                None => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            },
            None => Vec::new(),
        };
        Ok(DbIter::new(Box::new(snap.map(map_item)), overlay, false))
    }

    /// Reverse iterator starting at the last key `<= from` (or the column
    /// end), merged with this transaction's writes.
    pub fn reverse_iter<'a>(
        &'a self,
        col: Column,
        from: Option<&[u8]>,
    ) -> Result<DbIter<'a>, StoreError> {
        let cf = self.db.cf(col)?;
        let mode = match from {
            Some(key) => IteratorMode::From(key, Direction::Reverse),
            None => IteratorMode::End,
        };
        let snap = self.snapshot.iterator_cf(cf, mode);
        let mut overlay: Vec<(Vec<u8>, Option<Vec<u8>>)> = match self.writes.get(&col) {
            Some(map) => match from {
                Some(key) => map
                    .range(..=key.to_vec())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                None => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            },
            None => Vec::new(),
        };
        overlay.reverse();
        Ok(DbIter::new(Box::new(snap.map(map_item)), overlay, true))
    }

    /// Collect every pair whose key starts with `prefix`.
    pub fn prefix_collect(&self, col: Column, prefix: &[u8]) -> Result<Vec<KvPair>, StoreError> {
        let mut out = Vec::new();
        for item in self.forward_iter(col, Some(prefix))? {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key, value));
        }
        Ok(out)
    }

    // --- named counters -----------------------------------------------------

    fn counter_key(name: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(COUNTER_PREFIX.len() + name.len());
        key.extend_from_slice(COUNTER_PREFIX);
        key.extend_from_slice(name.as_bytes());
        key
    }

    /// Current value of a named counter (0 when absent).
    pub fn count_get(&self, name: &str) -> Result<u64, StoreError> {
        match self.get(Column::Prop, &Self::counter_key(name))? {
            Some(bytes) if bytes.len() == 8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes);
                Ok(u64::from_be_bytes(raw))
            }
            Some(_) => Err(StoreError::Corruption(format!("counter {name} malformed"))),
            None => Ok(0),
        }
    }

    /// Add to a named counter, returning the new value.
    pub fn count_add(&mut self, name: &str, n: u64) -> Result<u64, StoreError> {
        let value = self.count_get(name)?.saturating_add(n);
        self.put(Column::Prop, &Self::counter_key(name), &value.to_be_bytes());
        Ok(value)
    }

    /// Subtract from a named counter, returning the new value.
    pub fn count_reduce(&mut self, name: &str, n: u64) -> Result<u64, StoreError> {
        let value = self.count_get(name)?.saturating_sub(n);
        self.put(Column::Prop, &Self::counter_key(name), &value.to_be_bytes());
        Ok(value)
    }

    /// Remove a named counter.
    pub fn count_del(&mut self, name: &str) {
        self.del(Column::Prop, &Self::counter_key(name));
    }

    /// Flush the whole write set as one atomic batch.
    pub fn commit(self) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        for (col, lo, hi) in &self.range_deletes {
            let cf = self.db.cf(*col)?;
            batch.delete_range_cf(cf, lo, hi);
        }
        for (col, ops) in &self.writes {
            let cf = self.db.cf(*col)?;
            for (key, op) in ops {
                match op {
                    Some(value) => batch.put_cf(cf, key, value),
                    None => batch.delete_cf(cf, key),
                }
            }
        }
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.db.sync_writes());
        self.db.inner().write_opt(batch, &write_opts)?;
        Ok(())
    }
}

fn map_item(
    item: Result<(Box<[u8]>, Box<[u8]>), rocksdb::Error>,
) -> Result<KvPair, StoreError> {
    let (key, value) = item?;
    Ok((key.to_vec(), value.to_vec()))
}

/// Snapshot/write-set merged iterator. The write set wins on key collisions;
/// tombstones suppress snapshot rows.
pub struct DbIter<'a> {
    snap: std::iter::Peekable<Box<dyn Iterator<Item = Result<KvPair, StoreError>> + 'a>>,
    overlay: std::iter::Peekable<std::vec::IntoIter<(Vec<u8>, Option<Vec<u8>>)>>,
    reverse: bool,
}

impl<'a> DbIter<'a> {
    fn new(
        snap: Box<dyn Iterator<Item = Result<KvPair, StoreError>> + 'a>,
        overlay: Vec<(Vec<u8>, Option<Vec<u8>>)>,
        reverse: bool,
    ) -> Self {
        Self {
            snap: snap.peekable(),
            overlay: overlay.into_iter().peekable(),
            reverse,
        }
    }

    /// Does `a` come before `b` in iteration order?
    fn before(&self, a: &[u8], b: &[u8]) -> bool {
        if self.reverse {
            a > b
        } else {
            a < b
        }
    }
}

impl<'a> Iterator for DbIter<'a> {
    type Item = Result<KvPair, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let overlay_key = self.overlay.peek().map(|(k, _)| k.clone());
            // surface snapshot errors immediately
            if matches!(self.snap.peek(), Some(Err(_))) {
                return self.snap.next();
            }
            let snap_key = match self.snap.peek() {
                Some(Ok((k, _))) => Some(k.clone()),
                _ => None,
            };
            let use_overlay = match (&overlay_key, &snap_key) {
                (None, None) => return None,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(ok), Some(sk)) => {
                    if ok == sk {
                        self.snap.next(); // shadowed by the write set
                        true
                    } else {
                        self.before(ok, sk)
                    }
                }
            };
            if use_overlay {
                match self.overlay.next() {
                    Some((key, Some(value))) => return Some(Ok((key, value))),
                    Some((_, None)) => continue, // tombstone
                    None => return None,
                }
            } else {
                return self.snap.next();
            }
        }
    }
}

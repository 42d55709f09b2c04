//! # Typed Store Surface
//!
//! [`LedgerStore`] wraps the database with per-column typed accessors. All
//! values are RLP; composite keys use the fixed-width encodings from
//! `shared_types::keys`. Global singletons live in the `prop` column under
//! one-byte sentinels.

use crate::columns::Column;
use crate::database::{Database, DatabaseConfig};
use crate::errors::StoreError;
use crate::transaction::DbTransaction;
use rlp::{Decodable, Encodable};
use shared_types::{
    AccountInfo, AccountState, AdvanceInfo, Approve, ApproveReceipt, BlockChildKey, BlockHash,
    DagAccountInfo, EpochRecord, ForkSuccessorKey, FreeKey, HeadUnlink, NextUnlink, SkiplistInfo,
    StateHash, SummaryHash, TraceList, Unit, UnitState, UnlinkBlock, UnlinkInfo, Address, H256,
};
use std::path::Path;
use std::sync::Arc;

/// Global props, keyed by one-byte sentinels in the `prop` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    Version = 0,
    GenesisHash = 1,
    LastMci = 2,
    LastStableMci = 3,
    AdvanceInfo = 4,
    LastStableIndex = 5,
    CatchupIndex = 6,
    CatchupMaxIndex = 7,
}

impl Prop {
    fn key(self) -> [u8; 1] {
        [self as u8]
    }
}

/// Counter names tracked through the transactional counters.
pub const COUNT_BLOCK: &str = "block";
pub const COUNT_STABLE_BLOCK: &str = "stable_block";
pub const COUNT_DAG_FREE: &str = "dag_free";
pub const COUNT_UNLINK: &str = "unlink";

/// The typed accessor layer over the ledger database.
#[derive(Clone)]
pub struct LedgerStore {
    db: Arc<Database>,
}

fn get_rlp<T: Decodable>(
    txn: &DbTransaction<'_>,
    col: Column,
    key: &[u8],
) -> Result<Option<T>, StoreError> {
    match txn.get(col, key)? {
        Some(bytes) => Ok(Some(rlp::decode(&bytes)?)),
        None => Ok(None),
    }
}

fn put_rlp<T: Encodable>(txn: &mut DbTransaction<'_>, col: Column, key: &[u8], value: &T) {
    txn.put(col, key, &rlp::encode(value));
}

impl LedgerStore {
    /// Open the store at `path`.
    pub fn open(path: impl AsRef<Path>, config: DatabaseConfig) -> Result<Self, StoreError> {
        Ok(Self {
            db: Arc::new(Database::open(path, config)?),
        })
    }

    /// Begin a transaction (mutating under the single-writer lock, or a
    /// read-only snapshot for queries).
    pub fn begin_transaction(&self) -> DbTransaction<'_> {
        self.db.begin_transaction()
    }

    // --- blocks -------------------------------------------------------------

    pub fn block_get(&self, txn: &DbTransaction<'_>, hash: &BlockHash) -> Result<Option<Unit>, StoreError> {
        get_rlp(txn, Column::Blocks, hash.as_bytes())
    }

    pub fn block_exists(&self, txn: &DbTransaction<'_>, hash: &BlockHash) -> Result<bool, StoreError> {
        txn.exists(Column::Blocks, hash.as_bytes())
    }

    /// Persist a unit and bump the block counter.
    pub fn block_put(&self, txn: &mut DbTransaction<'_>, hash: &BlockHash, unit: &Unit) -> Result<(), StoreError> {
        put_rlp(txn, Column::Blocks, hash.as_bytes(), unit);
        txn.count_add(COUNT_BLOCK, 1)?;
        Ok(())
    }

    pub fn block_count(&self, txn: &DbTransaction<'_>) -> Result<u64, StoreError> {
        txn.count_get(COUNT_BLOCK)
    }

    pub fn block_data_get(&self, txn: &DbTransaction<'_>, data_hash: &H256) -> Result<Option<Vec<u8>>, StoreError> {
        txn.get(Column::BlocksData, data_hash.as_bytes())
    }

    pub fn block_data_put(&self, txn: &mut DbTransaction<'_>, data_hash: &H256, data: &[u8]) {
        txn.put(Column::BlocksData, data_hash.as_bytes(), data);
    }

    pub fn block_state_get(&self, txn: &DbTransaction<'_>, hash: &BlockHash) -> Result<Option<UnitState>, StoreError> {
        get_rlp(txn, Column::BlockState, hash.as_bytes())
    }

    pub fn block_state_put(&self, txn: &mut DbTransaction<'_>, hash: &BlockHash, state: &UnitState) {
        put_rlp(txn, Column::BlockState, hash.as_bytes(), state);
    }

    // --- accounts -----------------------------------------------------------

    pub fn account_get(&self, txn: &DbTransaction<'_>, account: &Address) -> Result<Option<AccountInfo>, StoreError> {
        get_rlp(txn, Column::AccountInfo, account.as_bytes())
    }

    pub fn account_put(&self, txn: &mut DbTransaction<'_>, account: &Address, info: &AccountInfo) {
        put_rlp(txn, Column::AccountInfo, account.as_bytes(), info);
    }

    pub fn dag_account_get(&self, txn: &DbTransaction<'_>, account: &Address) -> Result<Option<DagAccountInfo>, StoreError> {
        get_rlp(txn, Column::DagAccountInfo, account.as_bytes())
    }

    pub fn dag_account_put(&self, txn: &mut DbTransaction<'_>, account: &Address, info: &DagAccountInfo) {
        put_rlp(txn, Column::DagAccountInfo, account.as_bytes(), info);
    }

    pub fn account_state_get(&self, txn: &DbTransaction<'_>, hash: &StateHash) -> Result<Option<AccountState>, StoreError> {
        get_rlp(txn, Column::AccountState, hash.as_bytes())
    }

    pub fn account_state_put(&self, txn: &mut DbTransaction<'_>, state: &AccountState) -> StateHash {
        let hash = state.hash();
        put_rlp(txn, Column::AccountState, hash.as_bytes(), state);
        hash
    }

    /// Hash of the account's newest stabilised snapshot.
    pub fn latest_account_state_get(&self, txn: &DbTransaction<'_>, account: &Address) -> Result<Option<StateHash>, StoreError> {
        Ok(txn
            .get(Column::LatestAccountState, account.as_bytes())?
            .map(|bytes| StateHash::from_slice(&bytes)))
    }

    pub fn latest_account_state_put(&self, txn: &mut DbTransaction<'_>, account: &Address, hash: &StateHash) {
        txn.put(Column::LatestAccountState, account.as_bytes(), hash.as_bytes());
    }

    // --- successors and forks ----------------------------------------------

    /// Canonical successor of `previous` (the first admitted child by the
    /// same author).
    pub fn successor_get(&self, txn: &DbTransaction<'_>, previous: &BlockHash) -> Result<Option<BlockHash>, StoreError> {
        Ok(txn
            .get(Column::Successor, previous.as_bytes())?
            .map(|bytes| BlockHash::from_slice(&bytes)))
    }

    pub fn successor_put(&self, txn: &mut DbTransaction<'_>, previous: &BlockHash, successor: &BlockHash) {
        txn.put(Column::Successor, previous.as_bytes(), successor.as_bytes());
    }

    pub fn successor_del(&self, txn: &mut DbTransaction<'_>, previous: &BlockHash) {
        txn.del(Column::Successor, previous.as_bytes());
    }

    /// Record a fork rival of `previous` for quick fork discovery.
    pub fn fork_successor_put(&self, txn: &mut DbTransaction<'_>, previous: &BlockHash, successor: &BlockHash) {
        let key = ForkSuccessorKey {
            previous: *previous,
            successor: *successor,
        };
        txn.put(Column::Successor, &key.to_bytes(), &[]);
    }

    /// All recorded fork rivals of `previous`.
    pub fn fork_successors(&self, txn: &DbTransaction<'_>, previous: &BlockHash) -> Result<Vec<BlockHash>, StoreError> {
        let mut out = Vec::new();
        for (key, _) in txn.prefix_collect(Column::Successor, previous.as_bytes())? {
            // skip the canonical 32-byte pointer sharing the prefix
            if let Some(fork) = ForkSuccessorKey::from_bytes(&key) {
                out.push(fork.successor);
            }
        }
        Ok(out)
    }

    // --- main chain ---------------------------------------------------------

    pub fn main_chain_get(&self, txn: &DbTransaction<'_>, mci: u64) -> Result<Option<BlockHash>, StoreError> {
        Ok(txn
            .get(Column::MainChain, &mci.to_be_bytes())?
            .map(|bytes| BlockHash::from_slice(&bytes)))
    }

    pub fn main_chain_put(&self, txn: &mut DbTransaction<'_>, mci: u64, hash: &BlockHash) {
        txn.put(Column::MainChain, &mci.to_be_bytes(), hash.as_bytes());
    }

    pub fn main_chain_del(&self, txn: &mut DbTransaction<'_>, mci: u64) {
        txn.del(Column::MainChain, &mci.to_be_bytes());
    }

    pub fn stable_block_get(&self, txn: &DbTransaction<'_>, stable_index: u64) -> Result<Option<BlockHash>, StoreError> {
        Ok(txn
            .get(Column::StableBlock, &stable_index.to_be_bytes())?
            .map(|bytes| BlockHash::from_slice(&bytes)))
    }

    pub fn stable_block_put(&self, txn: &mut DbTransaction<'_>, stable_index: u64, hash: &BlockHash) -> Result<(), StoreError> {
        txn.put(Column::StableBlock, &stable_index.to_be_bytes(), hash.as_bytes());
        txn.count_add(COUNT_STABLE_BLOCK, 1)?;
        Ok(())
    }

    pub fn stable_block_count(&self, txn: &DbTransaction<'_>) -> Result<u64, StoreError> {
        txn.count_get(COUNT_STABLE_BLOCK)
    }

    pub fn skiplist_get(&self, txn: &DbTransaction<'_>, hash: &BlockHash) -> Result<Option<SkiplistInfo>, StoreError> {
        get_rlp(txn, Column::Skiplist, hash.as_bytes())
    }

    pub fn skiplist_put(&self, txn: &mut DbTransaction<'_>, hash: &BlockHash, skiplist: &SkiplistInfo) {
        put_rlp(txn, Column::Skiplist, hash.as_bytes(), skiplist);
    }

    // --- summaries ----------------------------------------------------------

    pub fn block_summary_get(&self, txn: &DbTransaction<'_>, hash: &BlockHash) -> Result<Option<SummaryHash>, StoreError> {
        Ok(txn
            .get(Column::BlockSummary, hash.as_bytes())?
            .map(|bytes| SummaryHash::from_slice(&bytes)))
    }

    pub fn block_summary_put(&self, txn: &mut DbTransaction<'_>, hash: &BlockHash, summary: &SummaryHash) {
        txn.put(Column::BlockSummary, hash.as_bytes(), summary.as_bytes());
    }

    pub fn summary_block_get(&self, txn: &DbTransaction<'_>, summary: &SummaryHash) -> Result<Option<BlockHash>, StoreError> {
        Ok(txn
            .get(Column::SummaryBlock, summary.as_bytes())?
            .map(|bytes| BlockHash::from_slice(&bytes)))
    }

    pub fn summary_block_put(&self, txn: &mut DbTransaction<'_>, summary: &SummaryHash, hash: &BlockHash) {
        txn.put(Column::SummaryBlock, summary.as_bytes(), hash.as_bytes());
    }

    // --- free units and children -------------------------------------------

    pub fn dag_free_put(&self, txn: &mut DbTransaction<'_>, key: &FreeKey) -> Result<(), StoreError> {
        txn.put(Column::DagFree, &key.to_bytes(), &[]);
        txn.count_add(COUNT_DAG_FREE, 1)?;
        Ok(())
    }

    pub fn dag_free_del(&self, txn: &mut DbTransaction<'_>, key: &FreeKey) -> Result<(), StoreError> {
        txn.del(Column::DagFree, &key.to_bytes());
        txn.count_reduce(COUNT_DAG_FREE, 1)?;
        Ok(())
    }

    pub fn dag_free_count(&self, txn: &DbTransaction<'_>) -> Result<u64, StoreError> {
        txn.count_get(COUNT_DAG_FREE)
    }

    /// The best free unit: first row of the ordered index.
    pub fn dag_free_best(&self, txn: &DbTransaction<'_>) -> Result<Option<FreeKey>, StoreError> {
        match txn.forward_iter(Column::DagFree, None)?.next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(FreeKey::from_bytes(&key))
            }
            None => Ok(None),
        }
    }

    /// Up to `limit` free units, best first.
    pub fn dag_free_collect(&self, txn: &DbTransaction<'_>, limit: usize) -> Result<Vec<FreeKey>, StoreError> {
        let mut out = Vec::new();
        for item in txn.forward_iter(Column::DagFree, None)? {
            let (key, _) = item?;
            if let Some(free) = FreeKey::from_bytes(&key) {
                out.push(free);
            }
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    pub fn block_child_put(&self, txn: &mut DbTransaction<'_>, parent: &BlockHash, child: &BlockHash) {
        let key = BlockChildKey {
            parent: *parent,
            child: *child,
        };
        txn.put(Column::BlockChild, &key.to_bytes(), &[]);
    }

    /// Every admitted child of `parent`.
    pub fn block_children(&self, txn: &DbTransaction<'_>, parent: &BlockHash) -> Result<Vec<BlockHash>, StoreError> {
        let mut out = Vec::new();
        for (key, _) in txn.prefix_collect(Column::BlockChild, parent.as_bytes())? {
            if let Some(pair) = BlockChildKey::from_bytes(&key) {
                out.push(pair.child);
            }
        }
        Ok(out)
    }

    // --- links, traces, approves, epochs ------------------------------------

    /// Stabilised unit that carries `link`, if any (double-spend guard).
    pub fn link_get(&self, txn: &DbTransaction<'_>, link: &H256) -> Result<Option<BlockHash>, StoreError> {
        Ok(txn
            .get(Column::Link, link.as_bytes())?
            .map(|bytes| BlockHash::from_slice(&bytes)))
    }

    pub fn link_put(&self, txn: &mut DbTransaction<'_>, link: &H256, block: &BlockHash) {
        txn.put(Column::Link, link.as_bytes(), block.as_bytes());
    }

    pub fn traces_get(&self, txn: &DbTransaction<'_>, link: &H256) -> Result<Option<TraceList>, StoreError> {
        get_rlp(txn, Column::Traces, link.as_bytes())
    }

    pub fn traces_put(&self, txn: &mut DbTransaction<'_>, link: &H256, traces: &TraceList) {
        put_rlp(txn, Column::Traces, link.as_bytes(), traces);
    }

    pub fn approve_get(&self, txn: &DbTransaction<'_>, hash: &H256) -> Result<Option<Approve>, StoreError> {
        get_rlp(txn, Column::Approve, hash.as_bytes())
    }

    pub fn approve_put(&self, txn: &mut DbTransaction<'_>, hash: &H256, approve: &Approve) {
        put_rlp(txn, Column::Approve, hash.as_bytes(), approve);
    }

    fn approve_receipt_key(epoch: u64, approve_hash: &H256) -> Vec<u8> {
        let mut key = Vec::with_capacity(40);
        key.extend_from_slice(&epoch.to_be_bytes());
        key.extend_from_slice(approve_hash.as_bytes());
        key
    }

    pub fn approve_receipt_put(&self, txn: &mut DbTransaction<'_>, epoch: u64, receipt: &ApproveReceipt) {
        put_rlp(
            txn,
            Column::ApproveReceipt,
            &Self::approve_receipt_key(epoch, &receipt.approve_hash),
            receipt,
        );
    }

    /// All approve receipts of an epoch.
    pub fn epoch_approve_receipts(&self, txn: &DbTransaction<'_>, epoch: u64) -> Result<Vec<ApproveReceipt>, StoreError> {
        let mut out = Vec::new();
        for (_, value) in txn.prefix_collect(Column::ApproveReceipt, &epoch.to_be_bytes())? {
            out.push(rlp::decode(&value)?);
        }
        Ok(out)
    }

    pub fn epoch_record_get(&self, txn: &DbTransaction<'_>, epoch: u64) -> Result<Option<EpochRecord>, StoreError> {
        get_rlp(txn, Column::EpochRecord, &epoch.to_be_bytes())
    }

    pub fn epoch_record_put(&self, txn: &mut DbTransaction<'_>, record: &EpochRecord) {
        put_rlp(txn, Column::EpochRecord, &record.epoch.to_be_bytes(), record);
    }

    // --- unlink bookkeeping -------------------------------------------------

    pub fn unlink_block_get(&self, txn: &DbTransaction<'_>, hash: &BlockHash) -> Result<Option<UnlinkBlock>, StoreError> {
        get_rlp(txn, Column::UnlinkBlock, hash.as_bytes())
    }

    pub fn unlink_block_exists(&self, txn: &DbTransaction<'_>, hash: &BlockHash) -> Result<bool, StoreError> {
        txn.exists(Column::UnlinkBlock, hash.as_bytes())
    }

    pub fn unlink_block_put(&self, txn: &mut DbTransaction<'_>, hash: &BlockHash, block: &UnlinkBlock) -> Result<(), StoreError> {
        put_rlp(txn, Column::UnlinkBlock, hash.as_bytes(), block);
        txn.count_add(COUNT_UNLINK, 1)?;
        Ok(())
    }

    pub fn unlink_block_del(&self, txn: &mut DbTransaction<'_>, hash: &BlockHash) -> Result<(), StoreError> {
        txn.del(Column::UnlinkBlock, hash.as_bytes());
        txn.count_reduce(COUNT_UNLINK, 1)?;
        Ok(())
    }

    pub fn unlink_count(&self, txn: &DbTransaction<'_>) -> Result<u64, StoreError> {
        txn.count_get(COUNT_UNLINK)
    }

    pub fn unlink_info_get(&self, txn: &DbTransaction<'_>, account: &Address) -> Result<Option<UnlinkInfo>, StoreError> {
        match txn.get(Column::UnlinkInfo, account.as_bytes())? {
            Some(bytes) => Ok(Some(UnlinkInfo::from_bytes(&bytes).ok_or_else(|| {
                StoreError::Corruption("unlink_info malformed".to_string())
            })?)),
            None => Ok(None),
        }
    }

    pub fn unlink_info_put(&self, txn: &mut DbTransaction<'_>, account: &Address, info: &UnlinkInfo) {
        txn.put(Column::UnlinkInfo, account.as_bytes(), &info.to_bytes());
    }

    pub fn head_unlink_put(&self, txn: &mut DbTransaction<'_>, head: &HeadUnlink) {
        txn.put(Column::HeadUnlink, &head.to_bytes(), &[]);
    }

    pub fn head_unlink_del(&self, txn: &mut DbTransaction<'_>, head: &HeadUnlink) {
        txn.del(Column::HeadUnlink, &head.to_bytes());
    }

    /// Oldest held unit, by arrival time.
    pub fn head_unlink_first(&self, txn: &DbTransaction<'_>) -> Result<Option<HeadUnlink>, StoreError> {
        match txn.forward_iter(Column::HeadUnlink, None)?.next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(HeadUnlink::from_bytes(&key))
            }
            None => Ok(None),
        }
    }

    pub fn next_unlink_put(&self, txn: &mut DbTransaction<'_>, link: &NextUnlink) {
        txn.put(Column::NextUnlink, &link.to_bytes(), &[]);
    }

    pub fn next_unlink_del(&self, txn: &mut DbTransaction<'_>, link: &NextUnlink) {
        txn.del(Column::NextUnlink, &link.to_bytes());
    }

    /// Held units waiting directly on `hash`.
    pub fn next_unlinks(&self, txn: &DbTransaction<'_>, hash: &BlockHash) -> Result<Vec<BlockHash>, StoreError> {
        let mut out = Vec::new();
        for (key, _) in txn.prefix_collect(Column::NextUnlink, hash.as_bytes())? {
            if let Some(pair) = NextUnlink::from_bytes(&key) {
                out.push(pair.next);
            }
        }
        Ok(out)
    }

    pub fn next_unlink_index_get(&self, txn: &DbTransaction<'_>, index: u64) -> Result<Option<BlockHash>, StoreError> {
        Ok(txn
            .get(Column::NextUnlinkIndex, &index.to_be_bytes())?
            .map(|bytes| BlockHash::from_slice(&bytes)))
    }

    pub fn next_unlink_index_put(&self, txn: &mut DbTransaction<'_>, index: u64, hash: &BlockHash) {
        txn.put(Column::NextUnlinkIndex, &index.to_be_bytes(), hash.as_bytes());
    }

    // --- catchup ------------------------------------------------------------

    pub fn catchup_chain_summary_put(&self, txn: &mut DbTransaction<'_>, index: u64, summary: &SummaryHash) {
        txn.put(Column::CatchupChainSummaries, &index.to_be_bytes(), summary.as_bytes());
    }

    pub fn catchup_chain_summary_get(&self, txn: &DbTransaction<'_>, index: u64) -> Result<Option<SummaryHash>, StoreError> {
        Ok(txn
            .get(Column::CatchupChainSummaries, &index.to_be_bytes())?
            .map(|bytes| SummaryHash::from_slice(&bytes)))
    }

    /// Drop all catchup bookkeeping; used when a catchup round is abandoned.
    pub fn catchup_clear(&self, txn: &mut DbTransaction<'_>) -> Result<(), StoreError> {
        let lo = [0u8; 8];
        let hi = [0xFFu8; 40];
        txn.del_range(Column::CatchupChainSummaries, &lo, &hi)?;
        txn.del_range(Column::CatchupChainBlockSummary, &lo, &hi)?;
        txn.del_range(Column::CatchupChainSummaryBlock, &lo, &hi)?;
        txn.del(Column::Prop, &Prop::CatchupIndex.key());
        txn.del(Column::Prop, &Prop::CatchupMaxIndex.key());
        Ok(())
    }

    pub fn hash_tree_summary_get(&self, txn: &DbTransaction<'_>, summary: &SummaryHash) -> Result<Option<BlockHash>, StoreError> {
        Ok(txn
            .get(Column::HashTreeSummary, summary.as_bytes())?
            .map(|bytes| BlockHash::from_slice(&bytes)))
    }

    pub fn hash_tree_summary_put(&self, txn: &mut DbTransaction<'_>, summary: &SummaryHash, hash: &BlockHash) {
        txn.put(Column::HashTreeSummary, summary.as_bytes(), hash.as_bytes());
    }

    // --- props --------------------------------------------------------------

    pub fn prop_u64_get(&self, txn: &DbTransaction<'_>, prop: Prop) -> Result<Option<u64>, StoreError> {
        match txn.get(Column::Prop, &prop.key())? {
            Some(bytes) if bytes.len() == 8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes);
                Ok(Some(u64::from_be_bytes(raw)))
            }
            Some(_) => Err(StoreError::Corruption(format!("prop {prop:?} malformed"))),
            None => Ok(None),
        }
    }

    pub fn prop_u64_put(&self, txn: &mut DbTransaction<'_>, prop: Prop, value: u64) {
        txn.put(Column::Prop, &prop.key(), &value.to_be_bytes());
    }

    pub fn genesis_hash_get(&self, txn: &DbTransaction<'_>) -> Result<Option<BlockHash>, StoreError> {
        Ok(txn
            .get(Column::Prop, &Prop::GenesisHash.key())?
            .map(|bytes| BlockHash::from_slice(&bytes)))
    }

    pub fn genesis_hash_put(&self, txn: &mut DbTransaction<'_>, hash: &BlockHash) {
        txn.put(Column::Prop, &Prop::GenesisHash.key(), hash.as_bytes());
    }

    pub fn last_mci_get(&self, txn: &DbTransaction<'_>) -> Result<u64, StoreError> {
        Ok(self.prop_u64_get(txn, Prop::LastMci)?.unwrap_or(0))
    }

    pub fn last_mci_put(&self, txn: &mut DbTransaction<'_>, mci: u64) {
        self.prop_u64_put(txn, Prop::LastMci, mci);
    }

    pub fn last_stable_mci_get(&self, txn: &DbTransaction<'_>) -> Result<u64, StoreError> {
        Ok(self.prop_u64_get(txn, Prop::LastStableMci)?.unwrap_or(0))
    }

    pub fn last_stable_mci_put(&self, txn: &mut DbTransaction<'_>, mci: u64) {
        self.prop_u64_put(txn, Prop::LastStableMci, mci);
    }

    pub fn last_stable_index_get(&self, txn: &DbTransaction<'_>) -> Result<u64, StoreError> {
        Ok(self.prop_u64_get(txn, Prop::LastStableIndex)?.unwrap_or(0))
    }

    pub fn last_stable_index_put(&self, txn: &mut DbTransaction<'_>, index: u64) {
        self.prop_u64_put(txn, Prop::LastStableIndex, index);
    }

    pub fn advance_info_get(&self, txn: &DbTransaction<'_>) -> Result<Option<AdvanceInfo>, StoreError> {
        match txn.get(Column::Prop, &Prop::AdvanceInfo.key())? {
            Some(bytes) => Ok(Some(AdvanceInfo::from_bytes(&bytes).ok_or_else(|| {
                StoreError::Corruption("advance_info malformed".to_string())
            })?)),
            None => Ok(None),
        }
    }

    pub fn advance_info_put(&self, txn: &mut DbTransaction<'_>, info: &AdvanceInfo) {
        txn.put(Column::Prop, &Prop::AdvanceInfo.key(), &info.to_bytes());
    }

    pub fn version_get(&self, txn: &DbTransaction<'_>) -> Result<Option<u64>, StoreError> {
        self.prop_u64_get(txn, Prop::Version)
    }

    pub fn version_put(&self, txn: &mut DbTransaction<'_>, version: u64) {
        self.prop_u64_put(txn, Prop::Version, version);
    }
}

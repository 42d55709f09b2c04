//! # Block Cache Crate
//!
//! A read-through LRU per record category over the ledger store, with a
//! *changing-set* barrier per category.
//!
//! ## Coherence protocol
//!
//! The single writer follows a fixed order for every mutation:
//!
//! 1. insert the affected keys into the changing-sets,
//! 2. commit the store batch,
//! 3. evict those keys from the caches,
//! 4. clear the changing-sets.
//!
//! While a key is in the changing-set, `get` bypasses the cache and reads the
//! store directly, and `put` is rejected. That order guarantees no reader
//! ever caches (or observes) a stale value across a commit.

mod category;

pub use category::CacheCategory;

use lc_01_ledger_store::{DbTransaction, LedgerStore, StoreError};
use shared_types::{
    AccountInfo, AccountState, Address, BlockHash, SummaryHash, Unit, UnitState, UnlinkBlock,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Default per-category capacity, in entries.
const DEFAULT_CAPACITY: usize = 100_000;

/// Entry capacities per category.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub blocks: usize,
    pub block_states: usize,
    pub latest_account_states: usize,
    pub unlink_blocks: usize,
    pub account_infos: usize,
    pub successors: usize,
    pub block_summaries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            blocks: DEFAULT_CAPACITY,
            block_states: DEFAULT_CAPACITY,
            latest_account_states: DEFAULT_CAPACITY,
            unlink_blocks: DEFAULT_CAPACITY,
            account_infos: DEFAULT_CAPACITY,
            successors: DEFAULT_CAPACITY,
            block_summaries: DEFAULT_CAPACITY,
        }
    }
}

/// The node-wide decoded-record cache.
pub struct BlockCache {
    blocks: CacheCategory<BlockHash, Arc<Unit>>,
    block_states: CacheCategory<BlockHash, Arc<UnitState>>,
    latest_account_states: CacheCategory<Address, Arc<AccountState>>,
    unlink_blocks: CacheCategory<BlockHash, Arc<UnlinkBlock>>,
    account_infos: CacheCategory<Address, Arc<AccountInfo>>,
    successors: CacheCategory<BlockHash, BlockHash>,
    block_summaries: CacheCategory<BlockHash, SummaryHash>,
    /// Current witness/validator set, maintained under the same barrier
    /// discipline as the record categories.
    validator_list: Mutex<HashSet<Address>>,
}

impl BlockCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            blocks: CacheCategory::new(config.blocks),
            block_states: CacheCategory::new(config.block_states),
            latest_account_states: CacheCategory::new(config.latest_account_states),
            unlink_blocks: CacheCategory::new(config.unlink_blocks),
            account_infos: CacheCategory::new(config.account_infos),
            successors: CacheCategory::new(config.successors),
            block_summaries: CacheCategory::new(config.block_summaries),
            validator_list: Mutex::new(HashSet::new()),
        }
    }

    // --- blocks -------------------------------------------------------------

    pub fn block_exists(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        hash: &BlockHash,
    ) -> Result<bool, StoreError> {
        Ok(self.block_get(store, txn, hash)?.is_some())
    }

    pub fn block_get(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        hash: &BlockHash,
    ) -> Result<Option<Arc<Unit>>, StoreError> {
        self.blocks
            .get_through(hash, || Ok(store.block_get(txn, hash)?.map(Arc::new)))
    }

    pub fn block_put(&self, hash: BlockHash, unit: Arc<Unit>) {
        self.blocks.put(hash, unit);
    }

    pub fn block_evict(&self, hashes: &HashSet<BlockHash>) {
        self.blocks.evict(hashes.iter());
    }

    pub fn mark_block_as_changing(&self, hashes: &HashSet<BlockHash>) {
        self.blocks.mark_changing(hashes.iter().copied());
    }

    pub fn clear_block_changing(&self) {
        self.blocks.clear_changing();
    }

    // --- block states -------------------------------------------------------

    pub fn block_state_get(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        hash: &BlockHash,
    ) -> Result<Option<Arc<UnitState>>, StoreError> {
        self.block_states
            .get_through(hash, || Ok(store.block_state_get(txn, hash)?.map(Arc::new)))
    }

    pub fn block_state_put(&self, hash: BlockHash, state: Arc<UnitState>) {
        self.block_states.put(hash, state);
    }

    pub fn block_state_evict(&self, hashes: &HashSet<BlockHash>) {
        self.block_states.evict(hashes.iter());
    }

    pub fn mark_block_state_as_changing(&self, hashes: &HashSet<BlockHash>) {
        self.block_states.mark_changing(hashes.iter().copied());
    }

    pub fn clear_block_state_changing(&self) {
        self.block_states.clear_changing();
    }

    // --- latest account states ----------------------------------------------

    pub fn latest_account_state_get(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        account: &Address,
    ) -> Result<Option<Arc<AccountState>>, StoreError> {
        self.latest_account_states.get_through(account, || {
            match store.latest_account_state_get(txn, account)? {
                Some(hash) => Ok(store.account_state_get(txn, &hash)?.map(Arc::new)),
                None => Ok(None),
            }
        })
    }

    pub fn latest_account_state_put(&self, account: Address, state: Arc<AccountState>) {
        self.latest_account_states.put(account, state);
    }

    pub fn latest_account_state_evict(&self, accounts: &HashSet<Address>) {
        self.latest_account_states.evict(accounts.iter());
    }

    pub fn mark_latest_account_state_as_changing(&self, accounts: &HashSet<Address>) {
        self.latest_account_states
            .mark_changing(accounts.iter().copied());
    }

    pub fn clear_latest_account_state_changing(&self) {
        self.latest_account_states.clear_changing();
    }

    // --- unlink blocks ------------------------------------------------------

    pub fn unlink_block_exists(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        hash: &BlockHash,
    ) -> Result<bool, StoreError> {
        Ok(self.unlink_block_get(store, txn, hash)?.is_some())
    }

    pub fn unlink_block_get(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        hash: &BlockHash,
    ) -> Result<Option<Arc<UnlinkBlock>>, StoreError> {
        self.unlink_blocks
            .get_through(hash, || Ok(store.unlink_block_get(txn, hash)?.map(Arc::new)))
    }

    pub fn unlink_block_put(&self, hash: BlockHash, block: Arc<UnlinkBlock>) {
        self.unlink_blocks.put(hash, block);
    }

    pub fn unlink_block_evict(&self, hashes: &HashSet<BlockHash>) {
        self.unlink_blocks.evict(hashes.iter());
    }

    pub fn mark_unlink_block_as_changing(&self, hashes: &HashSet<BlockHash>) {
        self.unlink_blocks.mark_changing(hashes.iter().copied());
    }

    pub fn clear_unlink_block_changing(&self) {
        self.unlink_blocks.clear_changing();
    }

    // --- account infos ------------------------------------------------------

    pub fn account_get(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        account: &Address,
    ) -> Result<Option<Arc<AccountInfo>>, StoreError> {
        self.account_infos
            .get_through(account, || Ok(store.account_get(txn, account)?.map(Arc::new)))
    }

    pub fn account_put(&self, account: Address, info: Arc<AccountInfo>) {
        self.account_infos.put(account, info);
    }

    pub fn account_evict(&self, accounts: &HashSet<Address>) {
        self.account_infos.evict(accounts.iter());
    }

    pub fn mark_account_as_changing(&self, accounts: &HashSet<Address>) {
        self.account_infos.mark_changing(accounts.iter().copied());
    }

    pub fn clear_account_changing(&self) {
        self.account_infos.clear_changing();
    }

    // --- successors ---------------------------------------------------------

    pub fn successor_get(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        previous: &BlockHash,
    ) -> Result<Option<BlockHash>, StoreError> {
        self.successors
            .get_through(previous, || store.successor_get(txn, previous))
    }

    pub fn successor_put(&self, previous: BlockHash, successor: BlockHash) {
        self.successors.put(previous, successor);
    }

    pub fn successor_evict(&self, roots: &HashSet<BlockHash>) {
        self.successors.evict(roots.iter());
    }

    pub fn mark_successor_as_changing(&self, roots: &HashSet<BlockHash>) {
        self.successors.mark_changing(roots.iter().copied());
    }

    pub fn clear_successor_changing(&self) {
        self.successors.clear_changing();
    }

    // --- block summaries ----------------------------------------------------

    pub fn block_summary_get(
        &self,
        store: &LedgerStore,
        txn: &DbTransaction<'_>,
        hash: &BlockHash,
    ) -> Result<Option<SummaryHash>, StoreError> {
        self.block_summaries
            .get_through(hash, || store.block_summary_get(txn, hash))
    }

    pub fn block_summary_put(&self, hash: BlockHash, summary: SummaryHash) {
        self.block_summaries.put(hash, summary);
    }

    pub fn block_summary_evict(&self, hashes: &HashSet<BlockHash>) {
        self.block_summaries.evict(hashes.iter());
    }

    pub fn mark_block_summary_as_changing(&self, hashes: &HashSet<BlockHash>) {
        self.block_summaries.mark_changing(hashes.iter().copied());
    }

    pub fn clear_block_summary_changing(&self) {
        self.block_summaries.clear_changing();
    }

    // --- validators ---------------------------------------------------------

    pub fn validator_list_contains(&self, account: &Address) -> bool {
        self.validator_list.lock().contains(account)
    }

    pub fn validator_list_put(&self, account: Address) -> bool {
        self.validator_list.lock().insert(account)
    }

    pub fn validator_list_erase(&self, account: &Address) {
        self.validator_list.lock().remove(account);
    }

    pub fn validator_list_replace(&self, accounts: impl IntoIterator<Item = Address>) {
        let mut list = self.validator_list.lock();
        list.clear();
        list.extend(accounts);
    }

    pub fn validator_list_snapshot(&self) -> HashSet<Address> {
        self.validator_list.lock().clone()
    }

    /// One line of per-category sizes for the operator log.
    pub fn report_cache_size(&self) -> String {
        format!(
            "block:{}, block_state:{}, latest_account_state:{}, unlink_block:{}, account_info:{}, successor:{}, block_summary:{}, validator_list:{}",
            self.blocks.len(),
            self.block_states.len(),
            self.latest_account_states.len(),
            self.unlink_blocks.len(),
            self.account_infos.len(),
            self.successors.len(),
            self.block_summaries.len(),
            self.validator_list.lock().len(),
        )
    }
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

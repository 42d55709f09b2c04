//! # Block Processor
//!
//! Serialises all ledger mutations. Every admission runs under one store
//! transaction; the block-cache barrier wraps the commit in the fixed
//! mark → commit → evict → clear order, so readers never observe a stale
//! cached record across a commit.

use crate::errors::ProcessError;
use crate::executor::LinkExecutor;
use crate::item::ProcessItem;
use crate::pools::{ApprovePool, TransactionPool};
use lc_01_ledger_store::{DbTransaction, LedgerStore, StoreError};
use lc_02_block_cache::BlockCache;
use lc_05_dag_engine::{chain::TouchedKeys, DagChain, DagError};
use lc_06_unhandled_cache::{AddResult, MissingSet, PayloadPool, UnhandledCache};
use shared_types::{
    Address, BlockHash, BlockStatus, HeadUnlink, NextUnlink, UnitState, UnlinkBlock, UnlinkInfo,
    H256,
};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Runs the witness election when a stabilised MCI closes an epoch, inside
/// the admission transaction. Implemented by the witness/epoch subsystem.
pub trait EpochElector: Send + Sync {
    fn elect(&self, txn: &mut DbTransaction<'_>, boundary_mci: u64) -> Result<(), StoreError>;
}

/// Elector stub for nodes (and tests) that never cross an epoch boundary.
pub struct NullElector;

impl EpochElector for NullElector {
    fn elect(&self, _txn: &mut DbTransaction<'_>, _boundary_mci: u64) -> Result<(), StoreError> {
        Ok(())
    }
}

/// What processing one unit did.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    Admitted {
        hash: BlockHash,
        status: BlockStatus,
        last_mci: u64,
        last_stable_mci: u64,
        stabilized: usize,
    },
    /// Parked in the unhandled cache.
    Pending {
        hash: BlockHash,
        missing_blocks: usize,
        missing_transactions: usize,
        missing_approves: usize,
    },
    AlreadyKnown(BlockHash),
    Invalid {
        hash: BlockHash,
        reason: String,
    },
}

/// The single writer of the ledger.
pub struct BlockProcessor {
    store: LedgerStore,
    cache: Arc<BlockCache>,
    chain: Arc<DagChain>,
    unhandled: Arc<UnhandledCache<ProcessItem>>,
    tx_pool: Arc<TransactionPool>,
    approve_pool: Arc<ApprovePool>,
    executor: LinkExecutor,
    elector: Arc<dyn EpochElector>,
    /// The ledger write lock; exactly one admission at a time.
    write_lock: Mutex<()>,
    /// Recently admitted hashes, for cheap duplicate suppression.
    recent: Mutex<HashSet<BlockHash>>,
}

struct MissingDeps {
    blocks: HashSet<BlockHash>,
    transactions: HashSet<H256>,
    approves: HashSet<H256>,
}

impl MissingDeps {
    fn any(&self) -> bool {
        !self.blocks.is_empty() || !self.transactions.is_empty() || !self.approves.is_empty()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl BlockProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: LedgerStore,
        cache: Arc<BlockCache>,
        chain: Arc<DagChain>,
        unhandled: Arc<UnhandledCache<ProcessItem>>,
        tx_pool: Arc<TransactionPool>,
        approve_pool: Arc<ApprovePool>,
        executor: LinkExecutor,
        elector: Arc<dyn EpochElector>,
    ) -> Self {
        Self {
            store,
            cache,
            chain,
            unhandled,
            tx_pool,
            approve_pool,
            executor,
            elector,
            write_lock: Mutex::new(()),
            recent: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn cache(&self) -> &Arc<BlockCache> {
        &self.cache
    }

    pub fn chain(&self) -> &Arc<DagChain> {
        &self.chain
    }

    pub fn tx_pool(&self) -> &Arc<TransactionPool> {
        &self.tx_pool
    }

    pub fn approve_pool(&self) -> &Arc<ApprovePool> {
        &self.approve_pool
    }

    /// Process one unit plus everything its admission releases from the
    /// unhandled cache. Outcomes are returned in processing order.
    pub fn process(&self, item: ProcessItem) -> Result<Vec<ProcessOutcome>, ProcessError> {
        let mut outcomes = Vec::new();
        let mut work: VecDeque<ProcessItem> = VecDeque::new();
        work.push_back(item);
        while let Some(item) = work.pop_front() {
            let outcome = self.process_one(item, &mut work)?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Transactions arrived from the transport: pool them and reprocess any
    /// pending units they unblock.
    pub fn on_transactions(
        &self,
        transactions: Vec<shared_types::Transaction>,
    ) -> Result<Vec<ProcessOutcome>, ProcessError> {
        let mut hashes = Vec::with_capacity(transactions.len());
        for tx in transactions {
            hashes.push(tx.hash());
            self.tx_pool.insert(tx);
        }
        let released = self.unhandled.release_transaction_dependency(hashes);
        self.reprocess(released)
    }

    /// An approve arrived from the transport.
    pub fn on_approve(
        &self,
        approve: shared_types::Approve,
    ) -> Result<Vec<ProcessOutcome>, ProcessError> {
        let hash = approve.hash();
        self.approve_pool.insert(approve);
        let released = self.unhandled.release_approve_dependency(&hash);
        self.reprocess(released)
    }

    /// Missing hashes for retransmission requests.
    pub fn missing_for_request(&self, limit: usize) -> MissingSet {
        self.unhandled.get_missings(limit)
    }

    fn reprocess(&self, released: Vec<ProcessItem>) -> Result<Vec<ProcessOutcome>, ProcessError> {
        let mut outcomes = Vec::new();
        for item in released {
            outcomes.extend(self.process(item)?);
        }
        Ok(outcomes)
    }

    fn process_one(
        &self,
        item: ProcessItem,
        work: &mut VecDeque<ProcessItem>,
    ) -> Result<ProcessOutcome, ProcessError> {
        let unit = item.unit.clone();
        let hash = unit.hash();

        if self.recent.lock().contains(&hash) {
            return Ok(ProcessOutcome::AlreadyKnown(hash));
        }
        {
            let txn = self.store.begin_transaction();
            if self.store.block_exists(&txn, &hash)? {
                return Ok(ProcessOutcome::AlreadyKnown(hash));
            }
        }

        // invalid signatures are rejected outright and never cached
        let author = match shared_crypto::recover(&hash, &unit.signature) {
            Ok(author) => author,
            Err(_) => {
                return Ok(ProcessOutcome::Invalid {
                    hash,
                    reason: "invalid signature".to_string(),
                })
            }
        };
        if unit.is_genesis() {
            return Ok(ProcessOutcome::Invalid {
                hash,
                reason: "genesis cannot be re-admitted".to_string(),
            });
        }

        // dependency triage
        let missing = self.collect_missing(&unit)?;
        if missing.any() {
            return self.park(item, hash, author, missing, work);
        }

        self.admit(item, hash, author, work)
    }

    fn collect_missing(&self, unit: &shared_types::Unit) -> Result<MissingDeps, ProcessError> {
        let txn = self.store.begin_transaction();
        let mut blocks = HashSet::new();
        for parent in &unit.parents {
            if !self.store.block_exists(&txn, parent)? {
                blocks.insert(*parent);
            }
        }
        if !unit.previous.is_zero() && !self.store.block_exists(&txn, &unit.previous)? {
            blocks.insert(unit.previous);
        }
        if !unit.witness_list_block.is_zero()
            && !self.store.block_exists(&txn, &unit.witness_list_block)?
        {
            blocks.insert(unit.witness_list_block);
        }
        let mut transactions = HashSet::new();
        for link in &unit.links {
            // a link is satisfied by the pool or by an earlier stabilisation
            if !self.tx_pool.contains(link) && self.store.link_get(&txn, link)?.is_none() {
                transactions.insert(*link);
            }
        }
        let mut approves = HashSet::new();
        for approve in &unit.approves {
            if !self.approve_pool.contains(approve)
                && self.store.approve_get(&txn, approve)?.is_none()
            {
                approves.insert(*approve);
            }
        }
        Ok(MissingDeps {
            blocks,
            transactions,
            approves,
        })
    }

    /// Park a unit with unresolved dependencies in the unhandled cache and
    /// persist its unlink bookkeeping for restart-safe retransmission.
    fn park(
        &self,
        item: ProcessItem,
        hash: BlockHash,
        author: Address,
        missing: MissingDeps,
        work: &mut VecDeque<ProcessItem>,
    ) -> Result<ProcessOutcome, ProcessError> {
        let unit = item.unit.clone();
        let arrival_time = item.arrival_time;
        let counts = (
            missing.blocks.len(),
            missing.transactions.len(),
            missing.approves.len(),
        );
        let result = self.unhandled.add(
            hash,
            missing.blocks.clone(),
            missing.transactions,
            missing.approves,
            item.clone(),
        );
        match result {
            AddResult::Retry => {
                // everything arrived in the meantime
                self.admit(item, hash, author, work)
            }
            AddResult::Exist => Ok(ProcessOutcome::Pending {
                hash,
                missing_blocks: counts.0,
                missing_transactions: counts.1,
                missing_approves: counts.2,
            }),
            AddResult::Success => {
                let _guard = self.write_lock.lock();
                let mut txn = self.store.begin_transaction();
                self.store.unlink_block_put(
                    &mut txn,
                    &hash,
                    &UnlinkBlock {
                        time: arrival_time,
                        unit: unit.clone(),
                    },
                )?;
                self.store.head_unlink_put(
                    &mut txn,
                    &HeadUnlink {
                        time: arrival_time,
                        hash,
                    },
                );
                for dep in &missing.blocks {
                    self.store.next_unlink_put(
                        &mut txn,
                        &NextUnlink {
                            hash: *dep,
                            next: hash,
                        },
                    );
                }
                let mut info = self
                    .store
                    .unlink_info_get(&txn, &author)?
                    .unwrap_or_default();
                if info.earliest_unlink.is_zero() {
                    info.earliest_unlink = hash;
                }
                info.latest_unlink = hash;
                self.store.unlink_info_put(&mut txn, &author, &info);

                // arrival-ordered index, replayed after a restart
                let index = txn.count_add("unlink_index", 1)?;
                self.store.next_unlink_index_put(&mut txn, index, &hash);

                let changing: HashSet<BlockHash> = [hash].into_iter().collect();
                self.cache.mark_unlink_block_as_changing(&changing);
                txn.commit()?;
                self.cache.unlink_block_evict(&changing);
                self.cache.clear_unlink_block_changing();

                tracing::debug!(
                    target: "lc::processor",
                    unit = ?hash,
                    missing_blocks = counts.0,
                    missing_transactions = counts.1,
                    missing_approves = counts.2,
                    "unit parked on missing dependencies"
                );
                Ok(ProcessOutcome::Pending {
                    hash,
                    missing_blocks: counts.0,
                    missing_transactions: counts.1,
                    missing_approves: counts.2,
                })
            }
        }
    }

    /// Admit under the ledger write lock: one store transaction, the cache
    /// barrier around its commit, then release of whatever waited on this
    /// hash.
    fn admit(
        &self,
        item: ProcessItem,
        hash: BlockHash,
        author: Address,
        work: &mut VecDeque<ProcessItem>,
    ) -> Result<ProcessOutcome, ProcessError> {
        let unit = item.unit;
        let _guard = self.write_lock.lock();
        let mut txn = self.store.begin_transaction();

        // stage carried approves so stabilisation can verify them
        for approve_hash in &unit.approves {
            if self.store.approve_get(&txn, approve_hash)?.is_none() {
                if let Some(approve) = self.approve_pool.get(approve_hash) {
                    self.store.approve_put(&mut txn, approve_hash, &approve);
                }
            }
        }

        let admit_result =
            self.chain
                .admit(&mut txn, &unit, author, &self.executor, unix_now());
        let outcome = match admit_result {
            Ok(outcome) => outcome,
            Err(DagError::Invalid(reason)) => {
                drop(txn);
                self.record_invalid(&unit, hash, author)?;
                return Ok(ProcessOutcome::Invalid { hash, reason });
            }
            Err(DagError::UnknownUnit(what)) => {
                drop(txn);
                tracing::warn!(target: "lc::processor", unit = ?hash, missing = %what, "dependency vanished mid-admission");
                return Ok(ProcessOutcome::Pending {
                    hash,
                    missing_blocks: 1,
                    missing_transactions: 0,
                    missing_approves: 0,
                });
            }
            Err(e) => return Err(e.into()),
        };

        for boundary in &outcome.epoch_boundaries {
            self.elector
                .elect(&mut txn, *boundary)
                .map_err(|e| ProcessError::Election(e.to_string()))?;
        }

        // clear this unit's unlink bookkeeping if it was ever parked
        if let Some(unlink) = self.store.unlink_block_get(&txn, &hash)? {
            self.store.unlink_block_del(&mut txn, &hash)?;
            self.store.head_unlink_del(
                &mut txn,
                &HeadUnlink {
                    time: unlink.time,
                    hash,
                },
            );
            for parent in &unit.parents {
                self.store.next_unlink_del(
                    &mut txn,
                    &NextUnlink {
                        hash: *parent,
                        next: hash,
                    },
                );
            }
        }

        // cache barrier: mark -> commit -> evict -> clear
        let touched = &outcome.touched;
        self.mark_changing(touched, &hash);
        txn.commit()?;
        self.evict_and_clear(touched, &hash);

        self.recent.lock().insert(hash);

        // anything that waited on this unit can run now
        for released in self.unhandled.release_dependency(&hash) {
            work.push_back(released);
        }

        tracing::info!(
            target: "lc::processor",
            unit = ?hash,
            status = ?outcome.status,
            last_mci = outcome.last_mci,
            last_stable_mci = outcome.last_stable_mci,
            stabilized = outcome.stabilized.len(),
            "unit admitted"
        );
        Ok(ProcessOutcome::Admitted {
            hash,
            status: outcome.status,
            last_mci: outcome.last_mci,
            last_stable_mci: outcome.last_stable_mci,
            stabilized: outcome.stabilized.len(),
        })
    }

    /// Persist a structurally invalid unit so it is never requested again.
    fn record_invalid(
        &self,
        unit: &shared_types::Unit,
        hash: BlockHash,
        author: Address,
    ) -> Result<(), ProcessError> {
        let mut txn = self.store.begin_transaction();
        self.store.block_put(&mut txn, &hash, unit)?;
        let mut state = UnitState::new_admitted(unit.unit_type, author, 0);
        state.status = BlockStatus::Invalid;
        self.store.block_state_put(&mut txn, &hash, &state);

        let changing: HashSet<BlockHash> = [hash].into_iter().collect();
        self.cache.mark_block_as_changing(&changing);
        self.cache.mark_block_state_as_changing(&changing);
        txn.commit()?;
        self.cache.block_evict(&changing);
        self.cache.block_state_evict(&changing);
        self.cache.clear_block_changing();
        self.cache.clear_block_state_changing();

        self.recent.lock().insert(hash);
        tracing::warn!(target: "lc::processor", unit = ?hash, "unit recorded as invalid");
        Ok(())
    }

    fn mark_changing(&self, touched: &TouchedKeys, hash: &BlockHash) {
        self.cache.mark_block_as_changing(&touched.blocks);
        self.cache.mark_block_state_as_changing(&touched.block_states);
        self.cache.mark_account_as_changing(&touched.accounts);
        self.cache
            .mark_latest_account_state_as_changing(&touched.latest_account_states);
        self.cache.mark_successor_as_changing(&touched.successors);
        self.cache
            .mark_block_summary_as_changing(&touched.block_summaries);
        let mut unlinks = touched.unlink_blocks.clone();
        unlinks.insert(*hash);
        self.cache.mark_unlink_block_as_changing(&unlinks);
    }

    fn evict_and_clear(&self, touched: &TouchedKeys, hash: &BlockHash) {
        self.cache.block_evict(&touched.blocks);
        self.cache.block_state_evict(&touched.block_states);
        self.cache.account_evict(&touched.accounts);
        self.cache
            .latest_account_state_evict(&touched.latest_account_states);
        self.cache.successor_evict(&touched.successors);
        self.cache.block_summary_evict(&touched.block_summaries);
        let mut unlinks = touched.unlink_blocks.clone();
        unlinks.insert(*hash);
        self.cache.unlink_block_evict(&unlinks);

        self.cache.clear_block_changing();
        self.cache.clear_block_state_changing();
        self.cache.clear_account_changing();
        self.cache.clear_latest_account_state_changing();
        self.cache.clear_successor_changing();
        self.cache.clear_block_summary_changing();
        self.cache.clear_unlink_block_changing();
    }
}

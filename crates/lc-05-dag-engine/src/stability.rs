//! # Stability
//!
//! A main-chain unit `u` stabilises once the tip `v` satisfies
//! `witnessed_level(v) - level(u) >= threshold_distance` and a witness
//! majority appears among the authors of the main-chain segment `[u, v]`.
//! Stabilising `u` freezes everything it includes: the not-yet-stable
//! ancestor closure, ordered `(level asc, hash asc)`, each unit getting the
//! next dense stable index, its light-unit execution, its approve receipts
//! and its summary hash.

use crate::chain::{DagChain, TouchedKeys};
use crate::errors::DagError;
use lc_01_ledger_store::DbTransaction;
use shared_types::{
    Address, ApproveReceipt, BlockHash, BlockStatus, DagAccountInfo, Receipt, SummaryHash, Unit,
    UnitType,
};
use std::collections::HashSet;

/// Outcome of executing one stabilised light unit.
#[derive(Debug, Clone)]
pub struct StableExecutionOutcome {
    /// `Ok` on success, `Fail` when execution raised an exception.
    pub status: BlockStatus,
    pub receipt: Option<Receipt>,
    /// Accounts whose state the execution touched.
    pub touched_accounts: Vec<Address>,
}

/// Execution hook invoked for every stabilised light unit, in stabilisation
/// order. The block processor implements this over the executive.
pub trait StableExecutor {
    fn execute_stable(
        &self,
        txn: &mut DbTransaction<'_>,
        unit: &Unit,
        hash: &BlockHash,
        mc_timestamp: u64,
    ) -> Result<StableExecutionOutcome, DagError>;
}

impl DagChain {
    /// Advance the stability frontier as far as the rule allows. Returns the
    /// new `last_stable_mci`, the stabilised units in order, and any
    /// epoch-closing MCIs crossed.
    pub(crate) fn advance_stable(
        &self,
        txn: &mut DbTransaction<'_>,
        executor: &dyn StableExecutor,
        now: u64,
        touched: &mut TouchedKeys,
    ) -> Result<(u64, Vec<BlockHash>, Vec<u64>), DagError> {
        let last_mci = self.store().last_mci_get(txn)?;
        let mut last_stable_mci = self.store().last_stable_mci_get(txn)?;
        let mut stabilized = Vec::new();
        let mut boundaries = Vec::new();
        if last_mci <= last_stable_mci {
            return Ok((last_stable_mci, stabilized, boundaries));
        }

        let tip_hash = self
            .store()
            .main_chain_get(txn, last_mci)?
            .ok_or_else(|| DagError::Invalid("missing main-chain tip".into()))?;
        let tip_state = self.state_of(txn, &tip_hash)?;

        loop {
            let candidate = last_stable_mci + 1;
            if candidate > last_mci {
                break;
            }
            let u_hash = match self.store().main_chain_get(txn, candidate)? {
                Some(hash) => hash,
                None => break,
            };
            let u_state = self.state_of(txn, &u_hash)?;

            let record = self
                .witness_record_for_epoch(txn, self.config().epoch_of_mci(candidate))?;
            let majority = self.config().majority.min(record.witness_set.len().max(1));

            if tip_state.witnessed_level < u_state.level + self.config().threshold_distance {
                break;
            }
            // witness majority among the MC authors of [candidate, last_mci]
            let mut seen: HashSet<Address> = HashSet::new();
            for mci in candidate..=last_mci {
                if seen.len() >= majority {
                    break;
                }
                if let Some(hash) = self.store().main_chain_get(txn, mci)? {
                    let state = self.state_of(txn, &hash)?;
                    if record.is_witness(&state.author) {
                        seen.insert(state.author);
                    }
                }
            }
            if seen.len() < majority {
                break;
            }

            let mc_unit = self.unit_of(txn, &u_hash)?;
            let batch = self.collect_stable_batch(txn, &u_hash)?;
            for hash in &batch {
                self.stabilize_one(txn, executor, hash, mc_unit.exec_timestamp, now, touched)?;
                stabilized.push(*hash);
            }

            last_stable_mci = candidate;
            self.store().last_stable_mci_put(txn, candidate);
            if self.config().is_epoch_boundary(candidate) {
                boundaries.push(candidate);
            }
            tracing::debug!(
                target: "lc::dag",
                mci = candidate,
                batch = batch.len(),
                "stability advanced"
            );
        }
        Ok((last_stable_mci, stabilized, boundaries))
    }

    /// The not-yet-stable ancestor closure of `mc_hash` (inclusive), in
    /// stabilisation order `(level asc, hash asc)`.
    fn collect_stable_batch(
        &self,
        txn: &DbTransaction<'_>,
        mc_hash: &BlockHash,
    ) -> Result<Vec<BlockHash>, DagError> {
        let mut batch: Vec<(u64, BlockHash)> = Vec::new();
        let mut visited: HashSet<BlockHash> = HashSet::new();
        let mut queue: Vec<BlockHash> = vec![*mc_hash];
        while let Some(hash) = queue.pop() {
            if !visited.insert(hash) {
                continue;
            }
            let state = self.state_of(txn, &hash)?;
            if state.is_stable {
                continue;
            }
            batch.push((state.level, hash));
            let unit = self.unit_of(txn, &hash)?;
            queue.extend(unit.parents);
        }
        batch.sort();
        Ok(batch.into_iter().map(|(_, hash)| hash).collect())
    }

    fn stabilize_one(
        &self,
        txn: &mut DbTransaction<'_>,
        executor: &dyn StableExecutor,
        hash: &BlockHash,
        mc_timestamp: u64,
        now: u64,
        touched: &mut TouchedKeys,
    ) -> Result<(), DagError> {
        let unit = self.unit_of(txn, hash)?;
        let mut state = self.state_of(txn, hash)?;

        state.is_stable = true;
        let index = self.store().last_stable_index_get(txn)? + 1;
        self.store().last_stable_index_put(txn, index);
        state.stable_index = index;
        state.mc_timestamp = mc_timestamp;
        state.stable_timestamp = now;

        // fork losers keep their DAG position but never execute
        if state.status == BlockStatus::Ok && unit.unit_type == UnitType::Light {
            let outcome = executor.execute_stable(txn, &unit, hash, mc_timestamp)?;
            state.status = outcome.status;
            state.receipt = outcome.receipt;
            for account in outcome.touched_accounts {
                touched.latest_account_states.insert(account);
                touched.accounts.insert(account);
                let mut info = self.store().account_get(txn, &account)?.unwrap_or_default();
                info.latest_stable_block = *hash;
                self.store().account_put(txn, &account, &info);
            }
        }

        self.process_approves(txn, &unit)?;

        // advance the author's stable pointer
        let mut info = self
            .store()
            .account_get(txn, &state.author)?
            .unwrap_or_default();
        info.latest_stable_block = *hash;
        self.store().account_put(txn, &state.author, &info);
        touched.accounts.insert(state.author);
        if unit.unit_type == UnitType::Dag {
            self.store().dag_account_put(
                txn,
                &state.author,
                &DagAccountInfo {
                    latest_stable_block: *hash,
                },
            );
        }

        self.store().stable_block_put(txn, index, hash)?;

        // summary: parents stabilise first, so their summaries exist
        let previous_summary = if unit.previous.is_zero() {
            SummaryHash::zero()
        } else {
            self.store()
                .block_summary_get(txn, &unit.previous)?
                .unwrap_or_else(SummaryHash::zero)
        };
        let mut parent_summaries = Vec::with_capacity(unit.parents.len());
        for parent in &unit.parents {
            parent_summaries.push(
                self.store()
                    .block_summary_get(txn, parent)?
                    .unwrap_or_else(SummaryHash::zero),
            );
        }
        let mut skiplist_summaries = Vec::new();
        if let Some(skiplist) = self.store().skiplist_get(txn, hash)? {
            for ancestor in &skiplist.list {
                skiplist_summaries.push(
                    self.store()
                        .block_summary_get(txn, ancestor)?
                        .unwrap_or_else(SummaryHash::zero),
                );
            }
        }
        let summary = crate::summary::gen_summary(
            hash,
            &previous_summary,
            &parent_summaries,
            &unit.links,
            &skiplist_summaries,
            state.status,
            index,
            mc_timestamp,
            state.receipt.as_ref(),
        );
        self.store().block_summary_put(txn, hash, &summary);
        self.store().summary_block_put(txn, &summary, hash);
        touched.block_summaries.insert(*hash);

        self.store().block_state_put(txn, hash, &state);
        touched.block_states.insert(*hash);
        Ok(())
    }

    /// Verify and record the approve messages a stabilised unit carries.
    /// Invalid approves are skipped; they never abort stabilisation.
    fn process_approves(&self, txn: &mut DbTransaction<'_>, unit: &Unit) -> Result<(), DagError> {
        for approve_hash in &unit.approves {
            let approve = match self.store().approve_get(txn, approve_hash)? {
                Some(approve) => approve,
                None => {
                    tracing::warn!(target: "lc::dag", approve = ?approve_hash, "approve missing at stabilisation");
                    continue;
                }
            };
            let sender = match shared_crypto::recover(&approve.hash(), &approve.signature) {
                Ok(sender) => sender,
                Err(_) => {
                    tracing::warn!(target: "lc::dag", approve = ?approve_hash, "approve signature invalid");
                    continue;
                }
            };
            let record = match self.store().epoch_record_get(txn, approve.epoch)? {
                Some(record) => record,
                None => {
                    tracing::warn!(target: "lc::dag", epoch = approve.epoch, "approve for unknown epoch");
                    continue;
                }
            };
            match shared_crypto::vrf_verify(&sender, &record.seed, &approve.proof) {
                Ok(output) => {
                    self.store().approve_receipt_put(
                        txn,
                        approve.epoch,
                        &ApproveReceipt {
                            approve_hash: *approve_hash,
                            sender,
                            output,
                        },
                    );
                }
                Err(_) => {
                    tracing::warn!(target: "lc::dag", approve = ?approve_hash, "approve proof invalid");
                }
            }
        }
        Ok(())
    }
}

//! # Stable Execution
//!
//! The processor's implementation of the DAG engine's stable-execution hook:
//! when a light unit stabilises, its links are executed in order against the
//! account-state overlay. A link already consumed by an earlier stabilisation
//! is skipped — reorgs never re-execute a transaction.

use lc_01_ledger_store::{DbTransaction, LedgerStore};
use lc_03_state::StateLedger;
use lc_04_executive::{EnvInfo, Executive, OpcodeVm, Permanence};
use lc_05_dag_engine::{DagError, StableExecutionOutcome, StableExecutor};
use crate::pools::TransactionPool;
use shared_types::{BlockHash, BlockStatus, Receipt, StateHash, TraceList, Unit, U256};
use std::sync::Arc;

/// Executes the links of stabilised light units.
pub struct LinkExecutor {
    store: LedgerStore,
    tx_pool: Arc<TransactionPool>,
    vm: Arc<dyn OpcodeVm>,
}

impl LinkExecutor {
    pub fn new(store: LedgerStore, tx_pool: Arc<TransactionPool>, vm: Arc<dyn OpcodeVm>) -> Self {
        Self { store, tx_pool, vm }
    }
}

impl StableExecutor for LinkExecutor {
    fn execute_stable(
        &self,
        txn: &mut DbTransaction<'_>,
        unit: &Unit,
        hash: &BlockHash,
        mc_timestamp: u64,
    ) -> Result<StableExecutionOutcome, DagError> {
        let mut state = StateLedger::new(&self.store);
        let env = EnvInfo {
            containing_block: *hash,
            mc_timestamp,
        };

        let mut all_ok = true;
        let mut gas_total = U256::zero();
        let mut from_state = StateHash::zero();
        let mut to_states = Vec::new();
        let mut logs = Vec::new();
        let mut touched_accounts = Vec::new();

        for link in &unit.links {
            // consumed by an earlier stabilisation; never executed twice
            if self.store.link_get(txn, link)?.is_some() {
                tracing::debug!(target: "lc::processor", link = ?link, "link already consumed, skipping");
                continue;
            }
            let tx = match self.tx_pool.get(link) {
                Some(tx) => tx,
                None => {
                    tracing::warn!(target: "lc::processor", link = ?link, "linked transaction absent at stabilisation");
                    all_ok = false;
                    continue;
                }
            };

            let mut executive = Executive::new(&mut state, env, self.vm.as_ref());
            let (result, receipt) = executive
                .execute(txn, &tx, Permanence::Committed)
                .map_err(|e| DagError::Execution(e.to_string()))?;
            let traces = executive.take_traces();
            self.store.traces_put(txn, link, &TraceList(traces));
            self.store.link_put(txn, link, hash);
            self.tx_pool.remove(link);

            if !result.excepted.is_none() {
                all_ok = false;
            }
            gas_total += receipt.gas_used;
            from_state = receipt.from_state;
            to_states.extend(receipt.to_states);
            logs.extend(receipt.logs);
            touched_accounts.extend(result.modified_accounts);
        }

        Ok(StableExecutionOutcome {
            status: if all_ok {
                BlockStatus::Ok
            } else {
                BlockStatus::Fail
            },
            receipt: Some(Receipt::new(from_state, to_states, gas_total, logs)),
            touched_accounts,
        })
    }
}

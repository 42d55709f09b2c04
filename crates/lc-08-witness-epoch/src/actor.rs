//! # Witness Actor
//!
//! The optional local operator role. On a jittered interval the actor checks
//! the gating conditions — not syncing, not already composing, seated in the
//! current committee, enough distance to its own last unit, and something
//! worth witnessing — then composes a unit citing the current DAG tips,
//! signs it and submits it on the processor's fast queue.

use lc_07_block_processor::{BlockProcessor, ItemSource, ProcessError, ProcessItem, ProcessorHandle};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared_crypto::{vrf_prove, Keypair};
use shared_types::{Approve, BlockHash, SignatureRSV, SummaryHash, Unit, UnitType, H256};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Operator-facing witness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessConfig {
    /// Whether this node runs the witness role at all.
    pub is_witness: bool,
    /// Lower bound of the composing interval, milliseconds.
    pub min_witness_interval_ms: u64,
    /// Upper bound of the composing interval, milliseconds.
    pub max_witness_interval_ms: u64,
    /// Parent citations per composed unit.
    pub max_parents: usize,
    /// Transaction links per composed unit.
    pub max_links: usize,
}

impl Default for WitnessConfig {
    fn default() -> Self {
        Self {
            is_witness: false,
            min_witness_interval_ms: 1_000,
            max_witness_interval_ms: 2_000,
            max_parents: 16,
            max_links: 256,
        }
    }
}

/// The local witness.
pub struct WitnessActor {
    processor: Arc<BlockProcessor>,
    handle: ProcessorHandle,
    keypair: Keypair,
    config: WitnessConfig,
    /// Set by the sync layer while catch-up is in flight.
    syncing: Arc<AtomicBool>,
    is_witnessing: AtomicBool,
    last_approved_epoch: Mutex<Option<u64>>,
    interval_count: AtomicU64,
    syncing_count: AtomicU64,
    not_seated_count: AtomicU64,
    idle_count: AtomicU64,
    composed_count: AtomicU64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl WitnessActor {
    pub fn new(
        processor: Arc<BlockProcessor>,
        handle: ProcessorHandle,
        keypair: Keypair,
        config: WitnessConfig,
        syncing: Arc<AtomicBool>,
    ) -> Self {
        Self {
            processor,
            handle,
            keypair,
            config,
            syncing,
            is_witnessing: AtomicBool::new(false),
            last_approved_epoch: Mutex::new(None),
            interval_count: AtomicU64::new(0),
            syncing_count: AtomicU64::new(0),
            not_seated_count: AtomicU64::new(0),
            idle_count: AtomicU64::new(0),
            composed_count: AtomicU64::new(0),
        }
    }

    /// The periodic loop; runs until the processor queue closes.
    pub async fn run(self: Arc<Self>) {
        if !self.config.is_witness {
            return;
        }
        tracing::info!(target: "lc::witness", account = ?self.keypair.address(), "witness actor started");
        loop {
            let interval = rand::thread_rng().gen_range(
                self.config.min_witness_interval_ms..=self.config.max_witness_interval_ms,
            );
            tokio::time::sleep(Duration::from_millis(interval)).await;
            self.interval_count.fetch_add(1, Ordering::Relaxed);
            match self.check_and_witness().await {
                Ok(_) => {}
                Err(ProcessError::QueueClosed) => break,
                Err(e) => {
                    tracing::warn!(target: "lc::witness", error = %e, "witness round failed");
                }
            }
        }
    }

    /// One witnessing round. Returns true when a unit was submitted.
    pub async fn check_and_witness(&self) -> Result<bool, ProcessError> {
        if self.syncing.load(Ordering::Acquire) {
            self.syncing_count.fetch_add(1, Ordering::Relaxed);
            return Ok(false);
        }
        if self.is_witnessing.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        let composing = ComposeGuard(&self.is_witnessing);

        let unit = match self.compose_unit()? {
            Some(unit) => unit,
            None => return Ok(false),
        };
        let hash = unit.hash();
        self.handle
            .submit(ProcessItem::new(unit, ItemSource::Local, unix_now()))
            .await?;
        self.composed_count.fetch_add(1, Ordering::Relaxed);
        tracing::info!(target: "lc::witness", unit = ?hash, "witness unit submitted");
        drop(composing);
        Ok(true)
    }

    /// Build and sign a new unit, or decide there is nothing to witness.
    pub fn compose_unit(&self) -> Result<Option<Unit>, ProcessError> {
        let store = self.processor.store();
        let chain = self.processor.chain();
        let txn = store.begin_transaction();

        let last_mci = store.last_mci_get(&txn)?;
        let last_stable_mci = store.last_stable_mci_get(&txn)?;
        let epoch = chain.config().epoch_of_mci(last_stable_mci);
        let record = chain
            .witness_record_for_epoch(&txn, epoch)
            .map_err(|e| ProcessError::Election(e.to_string()))?;
        if !record.is_witness(&self.keypair.address()) {
            self.not_seated_count.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        // something must warrant a new unit: pending payload or
        // unstabilised progress
        let has_pending = !self.processor.tx_pool().is_empty();
        if !has_pending && last_mci == last_stable_mci {
            self.idle_count.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        // keep enough distance to the last self-authored unit
        let my_info = store.account_get(&txn, &self.keypair.address())?;
        let previous = my_info
            .as_ref()
            .map(|info| info.latest_linked)
            .unwrap_or_else(BlockHash::zero);
        let tips = store.dag_free_collect(&txn, self.config.max_parents)?;
        if tips.is_empty() {
            return Ok(None);
        }
        if !previous.is_zero() {
            let my_state = store.block_state_get(&txn, &previous)?;
            let tip_level = tips[0].level;
            if let Some(my_state) = my_state {
                let distance = tip_level.saturating_sub(my_state.level);
                if distance < chain.config().threshold_distance {
                    self.idle_count.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        let mut parents: Vec<BlockHash> = tips.iter().map(|tip| tip.hash).collect();
        parents.sort();
        parents.dedup();

        // witness-list pointer: the current epoch's boundary unit
        let genesis = store
            .genesis_hash_get(&txn)?
            .unwrap_or_else(BlockHash::zero);
        let witness_list_block = if epoch == 0 {
            genesis
        } else {
            store
                .main_chain_get(&txn, epoch * chain.config().epoch_period)?
                .unwrap_or(genesis)
        };

        // stabilised tip this unit attests to
        let last_summary_block = store
            .main_chain_get(&txn, last_stable_mci)?
            .unwrap_or(genesis);
        let last_summary = store
            .block_summary_get(&txn, &last_summary_block)?
            .unwrap_or_else(SummaryHash::zero);

        let mut links: Vec<H256> = self.processor.tx_pool().pending_hashes();
        links.sort();
        links.truncate(self.config.max_links);

        let approves = self.maybe_approve(epoch, &record.seed)?;

        let mut unit = Unit {
            unit_type: if links.is_empty() {
                UnitType::Dag
            } else {
                UnitType::Light
            },
            previous,
            parents,
            witness_list_block,
            last_summary_block,
            last_summary,
            links,
            approves,
            exec_timestamp: unix_now(),
            data_hash: H256::zero(),
            signature: SignatureRSV::default(),
        };
        unit.signature = self
            .keypair
            .sign(&unit.hash())
            .map_err(|e| ProcessError::Election(e.to_string()))?;
        Ok(Some(unit))
    }

    /// Stand for the current epoch's election once per epoch.
    fn maybe_approve(&self, epoch: u64, seed: &H256) -> Result<Vec<H256>, ProcessError> {
        let mut last = self.last_approved_epoch.lock();
        if *last == Some(epoch) {
            return Ok(Vec::new());
        }
        let proof = vrf_prove(&self.keypair, seed)
            .map_err(|e| ProcessError::Election(e.to_string()))?;
        let mut approve = Approve {
            epoch,
            proof,
            signature: SignatureRSV::default(),
        };
        approve.signature = self
            .keypair
            .sign(&approve.hash())
            .map_err(|e| ProcessError::Election(e.to_string()))?;
        let hash = approve.hash();
        self.processor.on_approve(approve)?;
        *last = Some(epoch);
        Ok(vec![hash])
    }

    /// One line of round statistics for the operator log.
    pub fn info(&self) -> String {
        format!(
            "intervals:{}, syncing:{}, not_seated:{}, idle:{}, composed:{}",
            self.interval_count.load(Ordering::Relaxed),
            self.syncing_count.load(Ordering::Relaxed),
            self.not_seated_count.load(Ordering::Relaxed),
            self.idle_count.load(Ordering::Relaxed),
            self.composed_count.load(Ordering::Relaxed),
        )
    }

    pub fn account(&self) -> shared_types::Address {
        self.keypair.address()
    }
}

/// Clears the composing flag even on early error returns.
struct ComposeGuard<'a>(&'a AtomicBool);

impl Drop for ComposeGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_01_ledger_store::{DatabaseConfig, LedgerStore};
    use lc_02_block_cache::{BlockCache, CacheConfig};
    use lc_04_executive::NullVm;
    use lc_05_dag_engine::{DagChain, DagConfig};
    use lc_06_unhandled_cache::UnhandledCache;
    use lc_07_block_processor::{
        ApprovePool, LinkExecutor, NullElector, TransactionPool,
    };
    use shared_types::{Transaction, U256};
    use tempfile::TempDir;

    fn build_actor(dir: &TempDir, is_witness: bool) -> (Arc<WitnessActor>, Arc<BlockProcessor>, BlockHash) {
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let cache = Arc::new(BlockCache::new(CacheConfig::default()));
        let chain = Arc::new(DagChain::new(
            store.clone(),
            DagConfig::for_testing(1, 0, 1_000),
        ));
        let tx_pool = Arc::new(TransactionPool::new());
        let approve_pool = Arc::new(ApprovePool::new());
        let unhandled = Arc::new(UnhandledCache::new(
            tx_pool.clone(),
            approve_pool.clone(),
            1_000,
        ));
        let executor = LinkExecutor::new(store.clone(), tx_pool.clone(), Arc::new(NullVm));
        let witness = Keypair::from_bytes([0x61; 32]).unwrap();

        let genesis_unit = Unit {
            unit_type: UnitType::Dag,
            previous: BlockHash::zero(),
            parents: vec![],
            witness_list_block: BlockHash::zero(),
            last_summary_block: BlockHash::zero(),
            last_summary: SummaryHash::zero(),
            links: vec![],
            approves: vec![],
            exec_timestamp: 1_700_000_000,
            data_hash: H256::zero(),
            signature: SignatureRSV::default(),
        };
        let mut txn = store.begin_transaction();
        let genesis = chain
            .init_genesis(
                &mut txn,
                &genesis_unit,
                witness.address(),
                vec![witness.address()],
                H256::repeat_byte(0x01),
            )
            .unwrap();
        txn.commit().unwrap();

        let processor = Arc::new(BlockProcessor::new(
            store,
            cache,
            chain,
            unhandled,
            tx_pool,
            approve_pool,
            executor,
            Arc::new(NullElector),
        ));
        // only the synchronous compose path is exercised; the queue side is
        // left undriven
        let (handle, _queue) = lc_07_block_processor::channel();
        let actor = Arc::new(WitnessActor::new(
            processor.clone(),
            handle,
            Keypair::from_bytes([0x61; 32]).unwrap(),
            WitnessConfig {
                is_witness,
                ..WitnessConfig::default()
            },
            Arc::new(AtomicBool::new(false)),
        ));
        (actor, processor, genesis)
    }

    #[test]
    fn test_compose_skips_when_idle() {
        let dir = TempDir::new().unwrap();
        let (actor, _processor, _genesis) = build_actor(&dir, true);
        // no pending payload, everything stable
        assert!(actor.compose_unit().unwrap().is_none());
    }

    #[test]
    fn test_compose_builds_signed_unit_with_links() {
        let dir = TempDir::new().unwrap();
        let (actor, processor, genesis) = build_actor(&dir, true);

        let sender = Keypair::from_bytes([0x62; 32]).unwrap();
        let mut tx = Transaction {
            nonce: U256::zero(),
            gas_price: U256::one(),
            gas: U256::from(21_000u64),
            to: Some(shared_types::Address::repeat_byte(0x01)),
            value: U256::zero(),
            data: vec![],
            signature: SignatureRSV::default(),
        };
        tx.signature = sender.sign(&tx.hash()).unwrap();
        let link = tx.hash();
        processor.tx_pool().insert(tx);

        let unit = actor.compose_unit().unwrap().expect("pending tx warrants a unit");
        assert_eq!(unit.unit_type, UnitType::Light);
        assert_eq!(unit.parents, vec![genesis]);
        assert!(unit.links.contains(&link));
        // carries this epoch's approve
        assert_eq!(unit.approves.len(), 1);
        // signature recovers to the witness account
        let author = shared_crypto::recover(&unit.hash(), &unit.signature).unwrap();
        assert_eq!(author, actor.account());
    }

    #[test]
    fn test_approve_submitted_once_per_epoch() {
        let dir = TempDir::new().unwrap();
        let (actor, processor, _genesis) = build_actor(&dir, true);
        let seed = H256::repeat_byte(0x01);
        let first = actor.maybe_approve(0, &seed).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(processor.approve_pool().len(), 1);
        let second = actor.maybe_approve(0, &seed).unwrap();
        assert!(second.is_empty());
    }
}

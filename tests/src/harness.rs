//! # Test Harness
//!
//! A complete single-node write path over a temporary database, with helper
//! constructors for signed units and transactions.

use lc_01_ledger_store::{DatabaseConfig, LedgerStore};
use lc_02_block_cache::{BlockCache, CacheConfig};
use lc_04_executive::NullVm;
use lc_05_dag_engine::{DagChain, DagConfig};
use lc_06_unhandled_cache::UnhandledCache;
use lc_07_block_processor::{
    ApprovePool, BlockProcessor, EpochElector, ItemSource, LinkExecutor, NullElector, ProcessItem,
    ProcessOutcome, TransactionPool,
};
use lc_08_witness_epoch::EpochManager;
use shared_crypto::Keypair;
use shared_types::{
    BlockHash, SignatureRSV, SummaryHash, Transaction, Unit, UnitType, H256, U256,
};
use std::sync::Arc;
use tempfile::TempDir;

/// A wired single-node write path.
pub struct TestNet {
    pub store: LedgerStore,
    pub cache: Arc<BlockCache>,
    pub chain: Arc<DagChain>,
    pub processor: Arc<BlockProcessor>,
    pub witnesses: Vec<Keypair>,
    pub genesis: BlockHash,
    _dir: TempDir,
}

impl TestNet {
    /// Build a net with `witness_count` deterministic witness keys and a
    /// real epoch elector.
    pub fn new(witness_count: usize, threshold_distance: u64, epoch_period: u64) -> Self {
        Self::build(witness_count, threshold_distance, epoch_period, true)
    }

    /// Same, but with the elector stubbed out.
    pub fn without_elections(
        witness_count: usize,
        threshold_distance: u64,
        epoch_period: u64,
    ) -> Self {
        Self::build(witness_count, threshold_distance, epoch_period, false)
    }

    fn build(
        witness_count: usize,
        threshold_distance: u64,
        epoch_period: u64,
        real_elections: bool,
    ) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).expect("store");
        let cache = Arc::new(BlockCache::new(CacheConfig::default()));
        let config = DagConfig::for_testing(witness_count, threshold_distance, epoch_period);
        let chain = Arc::new(DagChain::new(store.clone(), config.clone()));

        let witnesses: Vec<Keypair> = (0..witness_count)
            .map(|i| Keypair::from_bytes([0x40 + i as u8; 32]).expect("witness key"))
            .collect();

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
                witnesses[0].address(),
                witnesses.iter().map(|w| w.address()).collect(),
                H256::repeat_byte(0x5E),
            )
            .expect("genesis");
        txn.commit().expect("genesis commit");

        let tx_pool = Arc::new(TransactionPool::new());
        let approve_pool = Arc::new(ApprovePool::new());
        let unhandled = Arc::new(UnhandledCache::new(
            tx_pool.clone(),
            approve_pool.clone(),
            10_000,
        ));
        let executor = LinkExecutor::new(store.clone(), tx_pool.clone(), Arc::new(NullVm));
        let elector: Arc<dyn EpochElector> = if real_elections {
            Arc::new(EpochManager::new(store.clone(), cache.clone(), config))
        } else {
            Arc::new(NullElector)
        };
        let processor = Arc::new(BlockProcessor::new(
            store.clone(),
            cache.clone(),
            chain.clone(),
            unhandled,
            tx_pool,
            approve_pool,
            executor,
            elector,
        ));

        Self {
            store,
            cache,
            chain,
            processor,
            witnesses,
            genesis,
            _dir: dir,
        }
    }

    /// Build and sign a unit by witness `author_index`.
    #[allow(clippy::too_many_arguments)]
    pub fn make_unit(
        &self,
        author_index: usize,
        unit_type: UnitType,
        previous: BlockHash,
        mut parents: Vec<BlockHash>,
        links: Vec<H256>,
        approves: Vec<H256>,
        timestamp: u64,
    ) -> Unit {
        parents.sort();
        parents.dedup();
        let mut unit = Unit {
            unit_type,
            previous,
            parents,
            witness_list_block: self.genesis,
            last_summary_block: BlockHash::zero(),
            last_summary: SummaryHash::zero(),
            links,
            approves,
            exec_timestamp: timestamp,
            data_hash: H256::zero(),
            signature: SignatureRSV::default(),
        };
        unit.signature = self.witnesses[author_index]
            .sign(&unit.hash())
            .expect("sign unit");
        unit
    }

    /// Push a unit through the processor.
    pub fn submit(&self, unit: &Unit) -> Vec<ProcessOutcome> {
        self.processor
            .process(ProcessItem::new(
                unit.clone(),
                ItemSource::Broadcast,
                1_700_000_500,
            ))
            .expect("process")
    }

    /// Build and sign a plain transfer.
    pub fn make_transfer(
        &self,
        sender: &Keypair,
        nonce: u64,
        to: shared_types::Address,
        value: u64,
    ) -> Transaction {
        let mut tx = Transaction {
            nonce: U256::from(nonce),
            gas_price: U256::one(),
            gas: U256::from(100_000u64),
            to: Some(to),
            value: U256::from(value),
            data: vec![],
            signature: SignatureRSV::default(),
        };
        tx.signature = sender.sign(&tx.hash()).expect("sign tx");
        tx
    }

    /// Fund an account directly in state (a genesis-style origin snapshot).
    pub fn fund(&self, address: shared_types::Address, amount: u64) {
        let mut state = lc_03_state::StateLedger::new(&self.store);
        let mut txn = self.store.begin_transaction();
        state
            .add_balance(&txn, &address, U256::from(amount))
            .expect("fund");
        state.commit(&mut txn, &self.genesis).expect("fund commit");
        txn.commit().expect("fund store commit");
    }
}

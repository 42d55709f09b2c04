//! # Node Container
//!
//! Builds every subsystem in dependency order and owns the running tasks:
//! store → cache → DAG chain → pools → unhandled cache → executive →
//! processor (+ queue) → epoch manager → witness actor.

use crate::config::NodeConfig;
use crate::genesis::GenesisConfig;
use lc_01_ledger_store::LedgerStore;
use lc_02_block_cache::{BlockCache, CacheConfig};
use lc_04_executive::NullVm;
use lc_05_dag_engine::DagChain;
use lc_06_unhandled_cache::UnhandledCache;
use lc_07_block_processor::{
    channel, ApprovePool, BlockProcessor, LinkExecutor, ProcessorHandle, ProcessorQueue,
    TransactionPool,
};
use lc_08_witness_epoch::{EpochManager, WitnessActor};
use shared_crypto::Keypair;
use shared_types::BlockHash;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handles of the running background tasks.
pub struct NodeTasks {
    pub queue: Option<JoinHandle<()>>,
    pub witness: Option<JoinHandle<()>>,
}

impl NodeTasks {
    /// Graceful shutdown: stop the witness, let the queue drain and commit
    /// in-flight batches.
    pub async fn shutdown(self) {
        if let Some(witness) = self.witness {
            witness.abort();
        }
        if let Some(queue) = self.queue {
            let _ = queue.await;
        }
    }
}

/// The wired node, ready to run.
pub struct Node {
    store: LedgerStore,
    cache: Arc<BlockCache>,
    chain: Arc<DagChain>,
    processor: Arc<BlockProcessor>,
    handle: ProcessorHandle,
    queue: Option<ProcessorQueue>,
    witness: Option<Arc<WitnessActor>>,
    genesis_hash: BlockHash,
    syncing: Arc<AtomicBool>,
}

impl Node {
    /// Build every subsystem and install (or verify) genesis.
    pub fn build(config: &NodeConfig, genesis: &GenesisConfig) -> anyhow::Result<Self> {
        let store = LedgerStore::open(
            &config.storage.data_dir,
            config.storage.database_config(),
        )?;
        let cache = Arc::new(BlockCache::new(CacheConfig::default()));
        let chain = Arc::new(DagChain::new(store.clone(), config.dag.clone()));
        let genesis_hash = genesis.install(&store, &chain)?;

        let tx_pool = Arc::new(TransactionPool::new());
        let approve_pool = Arc::new(ApprovePool::new());
        let unhandled = Arc::new(UnhandledCache::new(
            tx_pool.clone(),
            approve_pool.clone(),
            config.effective_unhandled_capacity(),
        ));
        let executor = LinkExecutor::new(store.clone(), tx_pool.clone(), Arc::new(NullVm));
        let elector = Arc::new(EpochManager::new(
            store.clone(),
            cache.clone(),
            config.dag.clone(),
        ));

        // seat the current committee in the in-memory validator list
        {
            let txn = store.begin_transaction();
            let last_stable = store.last_stable_mci_get(&txn)?;
            let record =
                chain.witness_record_for_epoch(&txn, config.dag.epoch_of_mci(last_stable))?;
            cache.validator_list_replace(record.witness_set);
        }

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
        let (handle, queue) = channel();

        let syncing = Arc::new(AtomicBool::new(false));
        let witness = if config.witness.is_witness {
            let secret = config
                .witness_secret
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("witness enabled but no witness_secret set"))?;
            let raw = hex::decode(secret.strip_prefix("0x").unwrap_or(secret))?;
            let bytes: [u8; 32] = raw
                .try_into()
                .map_err(|_| anyhow::anyhow!("witness secret must be 32 bytes"))?;
            let keypair = Keypair::from_bytes(bytes)
                .map_err(|e| anyhow::anyhow!("bad witness secret: {e}"))?;
            Some(Arc::new(WitnessActor::new(
                processor.clone(),
                handle.clone(),
                keypair,
                config.witness.clone(),
                syncing.clone(),
            )))
        } else {
            None
        };

        Ok(Self {
            store,
            cache,
            chain,
            processor,
            handle,
            queue: Some(queue),
            witness,
            genesis_hash,
            syncing,
        })
    }

    /// Spawn the processor queue and the witness actor. Call once.
    pub fn start(&mut self) -> NodeTasks {
        let queue = self
            .queue
            .take()
            .map(|queue| tokio::spawn(queue.run(self.processor.clone())));
        let witness = self
            .witness
            .as_ref()
            .map(|witness| tokio::spawn(witness.clone().run()));
        tracing::info!(
            target: "lc::node",
            genesis = ?self.genesis_hash,
            witness = witness.is_some(),
            "node started"
        );
        NodeTasks { queue, witness }
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

    pub fn processor(&self) -> &Arc<BlockProcessor> {
        &self.processor
    }

    /// Queue handle for the transport layer.
    pub fn processor_handle(&self) -> ProcessorHandle {
        self.handle.clone()
    }

    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis_hash
    }

    /// Flag consulted by the witness actor; set while catch-up runs.
    pub fn syncing_flag(&self) -> Arc<AtomicBool> {
        self.syncing.clone()
    }

    /// One status line for the operator log.
    pub fn status(&self) -> anyhow::Result<String> {
        let txn = self.store.begin_transaction();
        let last_mci = self.store.last_mci_get(&txn)?;
        let last_stable_mci = self.store.last_stable_mci_get(&txn)?;
        let blocks = self.store.block_count(&txn)?;
        let stable = self.store.stable_block_count(&txn)?;
        Ok(format!(
            "blocks:{blocks}, stable:{stable}, last_mci:{last_mci}, last_stable_mci:{last_stable_mci}, cache[{}]",
            self.cache.report_cache_size()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::GenesisAccount;
    use tempfile::TempDir;

    #[test]
    fn test_build_wires_a_node() {
        let dir = TempDir::new().unwrap();
        let mut config = NodeConfig::with_defaults();
        config.storage.data_dir = dir.path().to_path_buf();
        config.storage.sync_writes = false;
        let genesis = GenesisConfig {
            timestamp: 1_700_000_000,
            witnesses: vec![format!("0x{}", "11".repeat(20))],
            accounts: vec![GenesisAccount {
                address: format!("0x{}", "22".repeat(20)),
                balance: "5".to_string(),
            }],
        };
        let node = Node::build(&config, &genesis).unwrap();
        assert!(!node.genesis_hash().is_zero());
        // the committee is seated in the validator list
        assert_eq!(node.cache().validator_list_snapshot().len(), 1);
        let status = node.status().unwrap();
        assert!(status.contains("last_mci:0"));
    }

    #[test]
    fn test_witness_requires_secret() {
        let dir = TempDir::new().unwrap();
        let mut config = NodeConfig::with_defaults();
        config.storage.data_dir = dir.path().to_path_buf();
        config.storage.sync_writes = false;
        config.witness.is_witness = true;
        let genesis = GenesisConfig {
            timestamp: 1_700_000_000,
            witnesses: vec![format!("0x{}", "11".repeat(20))],
            accounts: vec![],
        };
        assert!(Node::build(&config, &genesis).is_err());
    }
}

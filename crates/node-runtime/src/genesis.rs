//! # Genesis Builder
//!
//! Deterministic construction of the genesis state: the genesis unit, the
//! epoch-0 committee, and one account snapshot per funded genesis account.
//! Installation is idempotent — an already-initialised store is left alone
//! after a hash check.

use lc_01_ledger_store::LedgerStore;
use lc_05_dag_engine::DagChain;
use serde::{Deserialize, Serialize};
use shared_types::{
    keccak256, AccountInfo, AccountState, Address, BlockHash, SignatureRSV, StateHash, SummaryHash,
    Unit, UnitType, H256, U256,
};

/// One funded account at genesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Hex address, `0x`-prefixed or bare.
    pub address: String,
    /// Decimal balance in base units.
    pub balance: String,
}

/// The genesis block of a chain deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub timestamp: u64,
    /// The epoch-0 witness committee, hex addresses.
    pub witnesses: Vec<String>,
    pub accounts: Vec<GenesisAccount>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            timestamp: 1_700_000_000,
            witnesses: Vec::new(),
            accounts: Vec::new(),
        }
    }
}

fn parse_address(raw: &str) -> anyhow::Result<Address> {
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(raw)?;
    if bytes.len() != 20 {
        anyhow::bail!("address must be 20 bytes: {raw}");
    }
    Ok(Address::from_slice(&bytes))
}

impl GenesisConfig {
    /// The genesis unit this config describes.
    pub fn genesis_unit(&self) -> Unit {
        Unit {
            unit_type: UnitType::Dag,
            previous: BlockHash::zero(),
            parents: vec![],
            witness_list_block: BlockHash::zero(),
            last_summary_block: BlockHash::zero(),
            last_summary: SummaryHash::zero(),
            links: vec![],
            approves: vec![],
            exec_timestamp: self.timestamp,
            data_hash: H256::zero(),
            signature: SignatureRSV::default(),
        }
    }

    /// The epoch-0 election seed, derived from the config content.
    pub fn seed(&self) -> H256 {
        let mut material = Vec::new();
        material.extend_from_slice(&self.timestamp.to_be_bytes());
        for witness in &self.witnesses {
            material.extend_from_slice(witness.as_bytes());
        }
        keccak256(&material)
    }

    /// Install genesis into an empty store; verify the hash on a non-empty
    /// one. Returns the genesis hash.
    pub fn install(&self, store: &LedgerStore, chain: &DagChain) -> anyhow::Result<BlockHash> {
        let unit = self.genesis_unit();
        let expected = unit.hash();

        {
            let txn = store.begin_transaction();
            if let Some(existing) = store.genesis_hash_get(&txn)? {
                if existing != expected {
                    anyhow::bail!(
                        "store was initialised with a different genesis ({existing:?} != {expected:?})"
                    );
                }
                return Ok(existing);
            }
        }

        let witnesses = self
            .witnesses
            .iter()
            .map(|raw| parse_address(raw))
            .collect::<anyhow::Result<Vec<Address>>>()?;
        if witnesses.is_empty() {
            anyhow::bail!("genesis requires at least one witness");
        }
        let author = witnesses[0];

        let mut txn = store.begin_transaction();
        let hash = chain.init_genesis(&mut txn, &unit, author, witnesses, self.seed())?;

        // fund the genesis accounts with content-addressed origin snapshots
        for account in &self.accounts {
            let address = parse_address(&account.address)?;
            let balance = U256::from_dec_str(&account.balance)
                .map_err(|e| anyhow::anyhow!("bad genesis balance: {e}"))?;
            let state = AccountState::new(address, hash, StateHash::zero(), U256::zero(), balance);
            let state_hash = store.account_state_put(&mut txn, &state);
            store.latest_account_state_put(&mut txn, &address, &state_hash);
            let info = AccountInfo {
                latest_stable_block: hash,
                latest_linked: hash,
            };
            store.account_put(&mut txn, &address, &info);
        }
        store.version_put(&mut txn, 1);
        txn.commit()?;
        tracing::info!(
            target: "lc::genesis",
            genesis = ?hash,
            accounts = self.accounts.len(),
            "genesis installed"
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_01_ledger_store::DatabaseConfig;
    use lc_05_dag_engine::DagConfig;
    use tempfile::TempDir;

    fn config() -> GenesisConfig {
        GenesisConfig {
            timestamp: 1_700_000_000,
            witnesses: vec![format!("0x{}", "11".repeat(20))],
            accounts: vec![GenesisAccount {
                address: format!("0x{}", "22".repeat(20)),
                balance: "1000000".to_string(),
            }],
        }
    }

    #[test]
    fn test_install_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let chain = DagChain::new(store.clone(), DagConfig::default());
        let genesis = config();

        let first = genesis.install(&store, &chain).unwrap();
        let second = genesis.install(&store, &chain).unwrap();
        assert_eq!(first, second);

        let txn = store.begin_transaction();
        assert_eq!(store.genesis_hash_get(&txn).unwrap(), Some(first));
        assert_eq!(store.last_mci_get(&txn).unwrap(), 0);
        // the funded account has an origin snapshot
        let address = Address::from_slice(&[0x22; 20]);
        let state_hash = store
            .latest_account_state_get(&txn, &address)
            .unwrap()
            .unwrap();
        let state = store.account_state_get(&txn, &state_hash).unwrap().unwrap();
        assert_eq!(state.balance, U256::from(1_000_000u64));
        assert_eq!(state.previous, StateHash::zero());
    }

    #[test]
    fn test_mismatched_genesis_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let chain = DagChain::new(store.clone(), DagConfig::default());
        config().install(&store, &chain).unwrap();

        let mut other = config();
        other.timestamp += 1;
        assert!(other.install(&store, &chain).is_err());
    }
}

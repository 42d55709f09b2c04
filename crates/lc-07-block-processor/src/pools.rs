//! # Payload Pools
//!
//! In-memory holding areas for transactions and approves that have arrived
//! from the transport but are not yet consumed by a stabilised unit. The
//! unhandled cache consults them when deciding what is genuinely missing.

use lc_06_unhandled_cache::PayloadPool;
use parking_lot::Mutex;
use shared_types::{Approve, Transaction, H256};
use std::collections::{HashMap, HashSet};

/// Pending transactions by hash.
#[derive(Default)]
pub struct TransactionPool {
    entries: Mutex<HashMap<H256, Transaction>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transaction; returns false when it was already present.
    pub fn insert(&self, tx: Transaction) -> bool {
        self.entries.lock().insert(tx.hash(), tx).is_none()
    }

    pub fn get(&self, hash: &H256) -> Option<Transaction> {
        self.entries.lock().get(hash).cloned()
    }

    pub fn remove(&self, hash: &H256) -> Option<Transaction> {
        self.entries.lock().remove(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Hashes of every pending transaction.
    pub fn pending_hashes(&self) -> Vec<H256> {
        self.entries.lock().keys().copied().collect()
    }
}

impl PayloadPool for TransactionPool {
    fn contains(&self, hash: &H256) -> bool {
        self.entries.lock().contains_key(hash)
    }

    fn known(&self) -> HashSet<H256> {
        self.entries.lock().keys().copied().collect()
    }
}

/// Pending approves by hash.
#[derive(Default)]
pub struct ApprovePool {
    entries: Mutex<HashMap<H256, Approve>>,
}

impl ApprovePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, approve: Approve) -> bool {
        self.entries.lock().insert(approve.hash(), approve).is_none()
    }

    pub fn get(&self, hash: &H256) -> Option<Approve> {
        self.entries.lock().get(hash).cloned()
    }

    pub fn remove(&self, hash: &H256) -> Option<Approve> {
        self.entries.lock().remove(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl PayloadPool for ApprovePool {
    fn contains(&self, hash: &H256) -> bool {
        self.entries.lock().contains_key(hash)
    }

    fn known(&self) -> HashSet<H256> {
        self.entries.lock().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{SignatureRSV, U256};

    fn make_tx(nonce: u64) -> Transaction {
        Transaction {
            nonce: U256::from(nonce),
            gas_price: U256::one(),
            gas: U256::from(21_000u64),
            to: Some(shared_types::Address::repeat_byte(0x01)),
            value: U256::zero(),
            data: vec![],
            signature: SignatureRSV::default(),
        }
    }

    #[test]
    fn test_insert_get_remove() {
        let pool = TransactionPool::new();
        let tx = make_tx(0);
        let hash = tx.hash();
        assert!(pool.insert(tx.clone()));
        assert!(!pool.insert(tx.clone()));
        assert!(pool.contains(&hash));
        assert_eq!(pool.get(&hash), Some(tx));
        assert_eq!(pool.len(), 1);
        pool.remove(&hash);
        assert!(!pool.contains(&hash));
    }

    #[test]
    fn test_known_snapshot() {
        let pool = TransactionPool::new();
        pool.insert(make_tx(0));
        pool.insert(make_tx(1));
        assert_eq!(pool.known().len(), 2);
    }
}

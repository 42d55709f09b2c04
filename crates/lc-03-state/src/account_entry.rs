//! # Account Entry
//!
//! The mutable overlay of one account inside a [`StateLedger`]: balance and
//! nonce scratch values, the storage overlay and original-value cache, and
//! the code cache. The underlying [`AccountState`] snapshot stays immutable;
//! commit produces a new snapshot.

use shared_types::{empty_code_hash, empty_trie_root, keccak256, AccountState, StateHash, H256, U256};
use std::collections::HashMap;

/// One account's in-flight state during execution.
#[derive(Debug, Clone)]
pub struct AccountEntry {
    /// Hash of the snapshot this entry was loaded from; zero for an account
    /// that did not exist yet.
    pub previous: StateHash,
    nonce: U256,
    balance: U256,
    /// Root of the committed storage this entry overlays.
    storage_root: H256,
    code_hash: H256,
    /// Overlay writes; take precedence over everything below.
    storage_overlay: HashMap<H256, H256>,
    /// Cache of committed values read during this transaction.
    storage_original: HashMap<H256, H256>,
    code_cache: Vec<u8>,
    has_new_code: bool,
    alive: bool,
    dirty: bool,
    /// Set by `clear_storage`/`kill`: committed storage must be dropped.
    storage_cleared: bool,
}

impl AccountEntry {
    /// Entry over an existing snapshot.
    pub fn from_snapshot(state: &AccountState) -> Self {
        AccountEntry {
            previous: state.hash(),
            nonce: state.nonce,
            balance: state.balance,
            storage_root: state.storage_root,
            code_hash: state.code_hash,
            storage_overlay: HashMap::new(),
            storage_original: HashMap::new(),
            code_cache: Vec::new(),
            has_new_code: false,
            alive: state.alive,
            dirty: false,
            storage_cleared: false,
        }
    }

    /// Entry for an account that does not exist yet.
    pub fn new_account() -> Self {
        AccountEntry {
            previous: StateHash::zero(),
            nonce: U256::zero(),
            balance: U256::zero(),
            storage_root: empty_trie_root(),
            code_hash: empty_code_hash(),
            storage_overlay: HashMap::new(),
            storage_original: HashMap::new(),
            code_cache: Vec::new(),
            has_new_code: false,
            alive: true,
            dirty: false,
            storage_cleared: false,
        }
    }

    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    /// Bump the nonce by one.
    pub fn inc_nonce(&mut self) {
        self.nonce += U256::one();
        self.changed();
    }

    /// Reset the nonce; used only to revert a prior bump.
    pub fn set_nonce(&mut self, nonce: U256) {
        self.nonce = nonce;
        self.changed();
    }

    pub fn balance(&self) -> U256 {
        self.balance
    }

    pub fn add_balance(&mut self, amount: U256) {
        self.balance += amount;
        self.changed();
    }

    /// Returns false when the balance is insufficient.
    #[must_use]
    pub fn sub_balance(&mut self, amount: U256) -> bool {
        if self.balance < amount {
            return false;
        }
        self.balance -= amount;
        self.changed();
        true
    }

    /// Overlay-aware storage read. `committed` resolves a slot against the
    /// flat storage backing `storage_root`.
    pub fn storage_value<E>(
        &mut self,
        key: &H256,
        committed: impl FnOnce(&H256) -> Result<Option<H256>, E>,
    ) -> Result<H256, E> {
        if let Some(value) = self.storage_overlay.get(key) {
            return Ok(*value);
        }
        if let Some(value) = self.storage_original.get(key) {
            return Ok(*value);
        }
        if self.storage_cleared {
            return Ok(H256::zero());
        }
        let value = committed(key)?.unwrap_or_else(H256::zero);
        self.storage_original.insert(*key, value);
        Ok(value)
    }

    /// Write a slot into the overlay.
    pub fn set_storage(&mut self, key: H256, value: H256) {
        self.storage_overlay.insert(key, value);
        self.changed();
    }

    /// Blank both overlays and reset to the empty trie. Used when a contract
    /// is overwritten.
    pub fn clear_storage(&mut self) {
        self.storage_overlay.clear();
        self.storage_original.clear();
        self.storage_root = empty_trie_root();
        self.storage_cleared = true;
        self.changed();
    }

    /// Kill the account (suicide opcode). Afterwards `is_alive` is false and
    /// commit garbage-collects the account.
    pub fn kill(&mut self) {
        self.alive = false;
        self.storage_overlay.clear();
        self.storage_original.clear();
        self.storage_root = empty_trie_root();
        self.code_hash = empty_code_hash();
        self.code_cache.clear();
        self.has_new_code = false;
        self.balance = U256::zero();
        self.storage_cleared = true;
        self.changed();
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Empty per the pruning rule: no balance, no nonce, no code.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce.is_zero() && self.code_hash == empty_code_hash()
    }

    pub fn has_code(&self) -> bool {
        self.code_hash != empty_code_hash()
    }

    pub fn has_new_code(&self) -> bool {
        self.has_new_code
    }

    pub fn code_hash(&self) -> H256 {
        self.code_hash
    }

    pub fn storage_root(&self) -> H256 {
        self.storage_root
    }

    pub fn storage_cleared(&self) -> bool {
        self.storage_cleared
    }

    pub fn storage_overlay(&self) -> &HashMap<H256, H256> {
        &self.storage_overlay
    }

    /// Deploy code; permitted only during the creation phase.
    pub fn set_code(&mut self, code: Vec<u8>) {
        self.code_hash = keccak256(&code);
        self.code_cache = code;
        self.has_new_code = true;
        self.changed();
    }

    /// Attach already-known code bytes. Returns false on a hash mismatch.
    #[must_use]
    pub fn note_code(&mut self, code: Vec<u8>) -> bool {
        if keccak256(&code) != self.code_hash {
            return false;
        }
        self.code_cache = code;
        true
    }

    pub fn code(&self) -> &[u8] {
        &self.code_cache
    }

    fn changed(&mut self) {
        self.dirty = true;
    }
}

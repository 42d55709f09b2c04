//! # State Ledger
//!
//! The explicit execution context: a map of in-flight [`AccountEntry`]
//! overlays over the committed account snapshots, with frame-level
//! checkpoints and a commit that writes new content-addressed snapshots plus
//! the flat storage and code columns.

use crate::account_entry::AccountEntry;
use crate::errors::StateError;
use crate::storage_trie::storage_root;
use lc_01_ledger_store::{Column, DbTransaction, LedgerStore};
use shared_types::{AccountState, Address, BlockHash, StateHash, H256, U256};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Addresses and snapshot hashes produced by a commit.
#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    /// New snapshot hash per touched account.
    pub states: HashMap<Address, StateHash>,
    /// Touched accounts in address order.
    pub touched: BTreeSet<Address>,
}

/// The account/storage execution context for one transaction.
pub struct StateLedger<'a> {
    store: &'a LedgerStore,
    accounts: HashMap<Address, AccountEntry>,
    checkpoints: Vec<HashMap<Address, AccountEntry>>,
}

fn flat_key(address: &Address, slot: &H256) -> Vec<u8> {
    let mut key = Vec::with_capacity(52);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(slot.as_bytes());
    key
}

/// Exclusive upper bound covering every flat-storage key of `address`.
fn flat_upper_bound(address: &Address) -> Vec<u8> {
    let mut hi = Vec::with_capacity(53);
    hi.extend_from_slice(address.as_bytes());
    hi.extend_from_slice(&[0xFF; 33]);
    hi
}

impl<'a> StateLedger<'a> {
    pub fn new(store: &'a LedgerStore) -> Self {
        Self {
            store,
            accounts: HashMap::new(),
            checkpoints: Vec::new(),
        }
    }

    fn ensure_entry(
        &mut self,
        txn: &DbTransaction<'_>,
        address: &Address,
    ) -> Result<&mut AccountEntry, StateError> {
        if !self.accounts.contains_key(address) {
            let entry = match self.store.latest_account_state_get(txn, address)? {
                Some(hash) => match self.store.account_state_get(txn, &hash)? {
                    Some(state) => AccountEntry::from_snapshot(&state),
                    None => AccountEntry::new_account(),
                },
                None => AccountEntry::new_account(),
            };
            self.accounts.insert(*address, entry);
        }
        Ok(self
            .accounts
            .get_mut(address)
            .unwrap_or_else(|| unreachable!("entry inserted above")))
    }

    /// True iff the account has a committed snapshot or in-flight changes.
    pub fn account_exists(
        &mut self,
        txn: &DbTransaction<'_>,
        address: &Address,
    ) -> Result<bool, StateError> {
        let entry = self.ensure_entry(txn, address)?;
        Ok(!entry.previous.is_zero() || entry.is_dirty())
    }

    pub fn balance(&mut self, txn: &DbTransaction<'_>, address: &Address) -> Result<U256, StateError> {
        Ok(self.ensure_entry(txn, address)?.balance())
    }

    pub fn nonce(&mut self, txn: &DbTransaction<'_>, address: &Address) -> Result<U256, StateError> {
        Ok(self.ensure_entry(txn, address)?.nonce())
    }

    pub fn add_balance(
        &mut self,
        txn: &DbTransaction<'_>,
        address: &Address,
        amount: U256,
    ) -> Result<(), StateError> {
        self.ensure_entry(txn, address)?.add_balance(amount);
        Ok(())
    }

    /// Returns false when the balance is insufficient.
    pub fn sub_balance(
        &mut self,
        txn: &DbTransaction<'_>,
        address: &Address,
        amount: U256,
    ) -> Result<bool, StateError> {
        Ok(self.ensure_entry(txn, address)?.sub_balance(amount))
    }

    pub fn inc_nonce(&mut self, txn: &DbTransaction<'_>, address: &Address) -> Result<(), StateError> {
        self.ensure_entry(txn, address)?.inc_nonce();
        Ok(())
    }

    /// Overlay-aware storage read; falls through to the flat storage column.
    pub fn storage_value(
        &mut self,
        txn: &DbTransaction<'_>,
        address: &Address,
        slot: &H256,
    ) -> Result<H256, StateError> {
        let key_owner = *address;
        let entry = self.ensure_entry(txn, address)?;
        entry.storage_value(slot, |slot| {
            Ok::<_, StateError>(
                txn.get(Column::ContractMain, &flat_key(&key_owner, slot))?
                    .map(|bytes| H256::from_slice(&bytes)),
            )
        })
    }

    pub fn set_storage(
        &mut self,
        txn: &DbTransaction<'_>,
        address: &Address,
        slot: H256,
        value: H256,
    ) -> Result<(), StateError> {
        self.ensure_entry(txn, address)?.set_storage(slot, value);
        Ok(())
    }

    pub fn clear_storage(&mut self, txn: &DbTransaction<'_>, address: &Address) -> Result<(), StateError> {
        self.ensure_entry(txn, address)?.clear_storage();
        Ok(())
    }

    pub fn kill_account(&mut self, txn: &DbTransaction<'_>, address: &Address) -> Result<(), StateError> {
        self.ensure_entry(txn, address)?.kill();
        Ok(())
    }

    pub fn is_alive(&mut self, txn: &DbTransaction<'_>, address: &Address) -> Result<bool, StateError> {
        Ok(self.ensure_entry(txn, address)?.is_alive())
    }

    /// Deploy code during the creation phase.
    pub fn set_code(
        &mut self,
        txn: &DbTransaction<'_>,
        address: &Address,
        code: Vec<u8>,
    ) -> Result<(), StateError> {
        self.ensure_entry(txn, address)?.set_code(code);
        Ok(())
    }

    /// The account's code, loading and hash-checking it on first use.
    pub fn code(&mut self, txn: &DbTransaction<'_>, address: &Address) -> Result<Vec<u8>, StateError> {
        let entry = self.ensure_entry(txn, address)?;
        if !entry.has_code() {
            return Ok(Vec::new());
        }
        if !entry.code().is_empty() {
            return Ok(entry.code().to_vec());
        }
        let code_hash = entry.code_hash();
        let code = txn
            .get(Column::ContractAux, code_hash.as_bytes())?
            .unwrap_or_default();
        let entry = self.ensure_entry(txn, address)?;
        if !entry.note_code(code.clone()) {
            return Err(StateError::CodeMismatch {
                address: format!("{address:?}"),
            });
        }
        Ok(code)
    }

    // --- checkpoints --------------------------------------------------------

    /// Open a frame checkpoint.
    pub fn checkpoint(&mut self) {
        self.checkpoints.push(self.accounts.clone());
    }

    /// Roll back to the matching checkpoint.
    pub fn revert_checkpoint(&mut self) -> Result<(), StateError> {
        let saved = self.checkpoints.pop().ok_or(StateError::NoCheckpoint)?;
        self.accounts = saved;
        Ok(())
    }

    /// Keep the changes and drop the matching checkpoint.
    pub fn discard_checkpoint(&mut self) -> Result<(), StateError> {
        self.checkpoints.pop().ok_or(StateError::NoCheckpoint)?;
        Ok(())
    }

    /// Addresses with in-flight modifications.
    pub fn touched(&self) -> BTreeSet<Address> {
        self.accounts
            .iter()
            .filter(|(_, entry)| entry.is_dirty())
            .map(|(address, _)| *address)
            .collect()
    }

    /// Drop all in-flight state without committing.
    pub fn rollback(&mut self) {
        self.accounts.clear();
        self.checkpoints.clear();
    }

    // --- commit -------------------------------------------------------------

    /// Flush every dirty entry: write flat storage and code, compute storage
    /// roots, persist new snapshots chained to their predecessors, and move
    /// the latest-state pointers.
    pub fn commit(
        &mut self,
        txn: &mut DbTransaction<'_>,
        containing_block: &BlockHash,
    ) -> Result<CommitOutcome, StateError> {
        let mut outcome = CommitOutcome::default();
        let addresses: Vec<Address> = self
            .accounts
            .iter()
            .filter(|(_, entry)| entry.is_dirty())
            .map(|(address, _)| *address)
            .collect();

        for address in addresses {
            let entry = match self.accounts.get(&address) {
                Some(entry) => entry.clone(),
                None => continue,
            };

            // storage: drop committed rows when cleared, then apply overlay
            if entry.storage_cleared() {
                txn.del_range(
                    Column::ContractMain,
                    address.as_bytes(),
                    &flat_upper_bound(&address),
                )?;
            }
            for (slot, value) in entry.storage_overlay() {
                let key = flat_key(&address, slot);
                if value.is_zero() {
                    txn.del(Column::ContractMain, &key);
                } else {
                    txn.put(Column::ContractMain, &key, value.as_bytes());
                }
            }

            // the merged flat rows are the account's full storage
            let mut pairs = BTreeMap::new();
            for (key, value) in txn.prefix_collect(Column::ContractMain, address.as_bytes())? {
                if key.len() == 52 {
                    pairs.insert(H256::from_slice(&key[20..]), H256::from_slice(&value));
                }
            }
            let root = storage_root(&pairs);

            if entry.has_new_code() {
                txn.put(Column::ContractAux, entry.code_hash().as_bytes(), entry.code());
            }

            let state = AccountState {
                address,
                containing_block: *containing_block,
                previous: entry.previous,
                nonce: entry.nonce(),
                balance: entry.balance(),
                storage_root: root,
                code_hash: entry.code_hash(),
                alive: entry.is_alive(),
            };
            let hash = self.store.account_state_put(txn, &state);
            self.store.latest_account_state_put(txn, &address, &hash);

            outcome.states.insert(address, hash);
            outcome.touched.insert(address);

            // reset the entry onto the committed snapshot
            self.accounts
                .insert(address, AccountEntry::from_snapshot(&state));
        }
        self.checkpoints.clear();
        Ok(outcome)
    }
}

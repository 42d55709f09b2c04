//! # Account Records
//!
//! [`AccountInfo`] tracks the newest stabilised and newest seen transaction
//! chain heads per address. [`AccountState`] is the content-addressed snapshot
//! written at each stabilisation touching the account; snapshots chain through
//! `previous`, terminating at the account's genesis-origin state.

use crate::primitives::{empty_code_hash, empty_trie_root, keccak256, Address, BlockHash, StateHash, H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Per-address chain-head pointers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountInfo {
    /// Newest unit affecting this account that has stabilised.
    pub latest_stable_block: BlockHash,
    /// Newest unit affecting this account that has been seen at all.
    pub latest_linked: BlockHash,
}

impl Encodable for AccountInfo {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.latest_stable_block);
        s.append(&self.latest_linked);
    }
}

impl Decodable for AccountInfo {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(AccountInfo {
            latest_stable_block: rlp.val_at(0)?,
            latest_linked: rlp.val_at(1)?,
        })
    }
}

/// Chain-head pointer for DAG (consensus) units per author.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DagAccountInfo {
    pub latest_stable_block: BlockHash,
}

impl Encodable for DagAccountInfo {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(1);
        s.append(&self.latest_stable_block);
    }
}

impl Decodable for DagAccountInfo {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 1 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(DagAccountInfo {
            latest_stable_block: rlp.val_at(0)?,
        })
    }
}

/// Immutable, content-addressed account snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub address: Address,
    /// Unit whose stabilisation produced this snapshot.
    pub containing_block: BlockHash,
    /// Hash of the account's previous snapshot; zero at the genesis state.
    pub previous: StateHash,
    pub nonce: U256,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
    /// False once the account has been killed; such snapshots are terminal.
    pub alive: bool,
}

impl AccountState {
    /// Fresh snapshot with empty storage and no code.
    pub fn new(
        address: Address,
        containing_block: BlockHash,
        previous: StateHash,
        nonce: U256,
        balance: U256,
    ) -> Self {
        AccountState {
            address,
            containing_block,
            previous,
            nonce,
            balance,
            storage_root: empty_trie_root(),
            code_hash: empty_code_hash(),
            alive: true,
        }
    }

    /// Content hash; the snapshot's identity in the `account_state` column.
    pub fn hash(&self) -> StateHash {
        keccak256(&rlp::encode(self))
    }

    pub fn has_code(&self) -> bool {
        self.code_hash != empty_code_hash()
    }

    /// Empty per the pruning rule: zero balance, zero nonce, no code.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce.is_zero() && !self.has_code()
    }
}

impl Encodable for AccountState {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(8);
        s.append(&self.address);
        s.append(&self.containing_block);
        s.append(&self.previous);
        s.append(&self.nonce);
        s.append(&self.balance);
        s.append(&self.storage_root);
        s.append(&self.code_hash);
        s.append(&self.alive);
    }
}

impl Decodable for AccountState {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 8 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(AccountState {
            address: rlp.val_at(0)?,
            containing_block: rlp.val_at(1)?,
            previous: rlp.val_at(2)?,
            nonce: rlp.val_at(3)?,
            balance: rlp.val_at(4)?,
            storage_root: rlp.val_at(5)?,
            code_hash: rlp.val_at(6)?,
            alive: rlp.val_at(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_state_roundtrip_and_hash() {
        let state = AccountState::new(
            Address::repeat_byte(0x01),
            BlockHash::repeat_byte(0x02),
            StateHash::zero(),
            U256::from(3u64),
            U256::from(1_000_000u64),
        );
        let decoded: AccountState = rlp::decode(&rlp::encode(&state)).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.hash(), state.hash());
    }

    #[test]
    fn test_fresh_account_is_not_empty_with_balance() {
        let mut state = AccountState::new(
            Address::repeat_byte(0x01),
            BlockHash::zero(),
            StateHash::zero(),
            U256::zero(),
            U256::zero(),
        );
        assert!(state.is_empty());
        state.balance = U256::one();
        assert!(!state.is_empty());
    }

    #[test]
    fn test_account_info_roundtrip() {
        let info = AccountInfo {
            latest_stable_block: BlockHash::repeat_byte(0x0A),
            latest_linked: BlockHash::repeat_byte(0x0B),
        };
        let decoded: AccountInfo = rlp::decode(&rlp::encode(&info)).unwrap();
        assert_eq!(decoded, info);
    }
}

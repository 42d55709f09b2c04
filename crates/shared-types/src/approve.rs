//! # Approves and Epochs
//!
//! An [`Approve`] is the signed message any eligible account submits to stand
//! for witness election. Its `proof` is a deterministic VRF-style proof over
//! the epoch seed; the sorted proof outputs of the closing epoch elect the
//! next witness set, persisted as an [`EpochRecord`].

use crate::primitives::{keccak256, Address, BlockHash, SignatureRSV, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// A witness-election message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approve {
    /// The epoch this approve stands for election in (the closing epoch).
    pub epoch: u64,
    /// VRF-style proof over the epoch seed; verified against the sender key.
    pub proof: Vec<u8>,
    /// 65-byte recoverable signature over [`Approve::hash`].
    pub signature: SignatureRSV,
}

impl Approve {
    /// Identity hash: Keccak-256 over the RLP of `[epoch, proof]`.
    pub fn hash(&self) -> H256 {
        let mut s = RlpStream::new_list(2);
        s.append(&self.epoch);
        s.append(&self.proof);
        keccak256(&s.out())
    }
}

impl Encodable for Approve {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.epoch);
        s.append(&self.proof);
        s.append(&self.signature);
    }
}

impl Decodable for Approve {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Approve {
            epoch: rlp.val_at(0)?,
            proof: rlp.val_at(1)?,
            signature: rlp.val_at(2)?,
        })
    }
}

/// Verification record of a processed approve: who sent it and the VRF
/// output its proof evaluated to. Election sorts these outputs ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveReceipt {
    pub approve_hash: H256,
    pub sender: Address,
    pub output: H256,
}

impl Encodable for ApproveReceipt {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.approve_hash);
        s.append(&self.sender);
        s.append(&self.output);
    }
}

impl Decodable for ApproveReceipt {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(ApproveReceipt {
            approve_hash: rlp.val_at(0)?,
            sender: rlp.val_at(1)?,
            output: rlp.val_at(2)?,
        })
    }
}

/// The witness committee of one epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochRecord {
    pub epoch: u64,
    /// Elected witnesses, sorted ascending for a canonical encoding.
    pub witness_set: Vec<Address>,
    /// Seed for the next election: hash of the electing context.
    pub seed: H256,
}

impl EpochRecord {
    pub fn new(epoch: u64, mut witness_set: Vec<Address>, seed: H256) -> Self {
        witness_set.sort();
        witness_set.dedup();
        EpochRecord {
            epoch,
            witness_set,
            seed,
        }
    }

    pub fn is_witness(&self, account: &Address) -> bool {
        self.witness_set.binary_search(account).is_ok()
    }

    /// Smallest number of witnesses that constitutes a majority.
    pub fn majority(&self) -> usize {
        self.witness_set.len() / 2 + 1
    }
}

impl Encodable for EpochRecord {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.epoch);
        s.append_list(&self.witness_set);
        s.append(&self.seed);
    }
}

impl Decodable for EpochRecord {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(EpochRecord {
            epoch: rlp.val_at(0)?,
            witness_set: rlp.list_at(1)?,
            seed: rlp.val_at(2)?,
        })
    }
}

/// Seed material for epoch `e + 1` given the record of epoch `e`.
pub fn next_epoch_seed(record: &EpochRecord, boundary_block: &BlockHash) -> H256 {
    let mut s = RlpStream::new_list(3);
    s.append(&record.epoch);
    s.append(&record.seed);
    s.append(boundary_block);
    keccak256(&s.out())
}

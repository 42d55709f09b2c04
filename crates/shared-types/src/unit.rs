//! # Units
//!
//! The block form of the DAG. A unit cites 1..N parents, carries transaction
//! links and approve references, and snapshots the stabilised tip its author
//! witnessed (`last_summary_block` / `last_summary`).
//!
//! On the wire a unit is the RLP list
//! `[type, previous, parents[], witness_list_block, last_summary_block,
//! last_summary, links[], approves[], exec_timestamp, data_hash, signature]`.
//! Its identity is Keccak-256 over that list *excluding* the signature; the
//! author signs the identity hash. Bulky payload bytes live outside the unit,
//! keyed by `data_hash`.

use crate::primitives::{keccak256, BlockHash, SignatureRSV, SummaryHash, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Role of a unit in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitType {
    /// Consensus-bearing unit; advances the DAG structure.
    Dag,
    /// Transaction-bearing unit; its links are executed at stabilisation.
    Light,
}

impl UnitType {
    fn from_u8(v: u8) -> Result<Self, DecoderError> {
        match v {
            0 => Ok(UnitType::Dag),
            1 => Ok(UnitType::Light),
            _ => Err(DecoderError::Custom("unknown unit type")),
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            UnitType::Dag => 0,
            UnitType::Light => 1,
        }
    }
}

/// A block of the DAG ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Consensus-bearing or transaction-bearing.
    pub unit_type: UnitType,
    /// Previous unit by the same author; zero for the author's first unit.
    pub previous: BlockHash,
    /// Ordered parent citations; empty only for genesis.
    pub parents: Vec<BlockHash>,
    /// Unit defining the witness epoch this unit is validated under.
    pub witness_list_block: BlockHash,
    /// Most recent main-chain unit the author saw stabilised.
    pub last_summary_block: BlockHash,
    /// Summary hash of `last_summary_block`.
    pub last_summary: SummaryHash,
    /// Transaction hashes carried by this unit (light units).
    pub links: Vec<H256>,
    /// Approve-message hashes carried by this unit.
    pub approves: Vec<H256>,
    /// Author-side execution timestamp, seconds since epoch.
    pub exec_timestamp: u64,
    /// Hash of the separately stored payload; zero when there is none.
    pub data_hash: H256,
    /// 65-byte recoverable signature over [`Unit::hash`].
    pub signature: SignatureRSV,
}

impl Unit {
    /// True iff this is the genesis unit (no parents).
    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }

    /// Identity hash: Keccak-256 over the RLP of all fields but the signature.
    pub fn hash(&self) -> BlockHash {
        let mut s = RlpStream::new_list(10);
        self.append_unsigned(&mut s);
        keccak256(&s.out())
    }

    fn append_unsigned(&self, s: &mut RlpStream) {
        s.append(&self.unit_type.as_u8());
        s.append(&self.previous);
        s.append_list(&self.parents);
        s.append(&self.witness_list_block);
        s.append(&self.last_summary_block);
        s.append(&self.last_summary);
        s.append_list(&self.links);
        s.append_list(&self.approves);
        s.append(&self.exec_timestamp);
        s.append(&self.data_hash);
    }
}

impl Encodable for Unit {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(11);
        self.append_unsigned(s);
        s.append(&self.signature);
    }
}

impl Decodable for Unit {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 11 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Unit {
            unit_type: UnitType::from_u8(rlp.val_at(0)?)?,
            previous: rlp.val_at(1)?,
            parents: rlp.list_at(2)?,
            witness_list_block: rlp.val_at(3)?,
            last_summary_block: rlp.val_at(4)?,
            last_summary: rlp.val_at(5)?,
            links: rlp.list_at(6)?,
            approves: rlp.list_at(7)?,
            exec_timestamp: rlp.val_at(8)?,
            data_hash: rlp.val_at(9)?,
            signature: rlp.val_at(10)?,
        })
    }
}

//! # Composite Store Keys and Holding Records
//!
//! Fixed-width byte encodings for the ordered-index columns. Keys serialise
//! as raw concatenations so the store's byte order is the intended iteration
//! order; descending components are stored bit-inverted.

use crate::primitives::{BlockHash, H256};
use crate::unit::Unit;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Key of the `dag_free` index: free units ordered by
/// `(witnessed_level desc, level desc, hash asc)`, so the first row is the
/// best DAG tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeKey {
    pub witnessed_level: u64,
    pub level: u64,
    pub hash: BlockHash,
}

impl FreeKey {
    pub const WIDTH: usize = 8 + 8 + 32;

    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out[..8].copy_from_slice(&(!self.witnessed_level).to_be_bytes());
        out[8..16].copy_from_slice(&(!self.level).to_be_bytes());
        out[16..].copy_from_slice(self.hash.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIDTH {
            return None;
        }
        let mut wl = [0u8; 8];
        wl.copy_from_slice(&bytes[..8]);
        let mut level = [0u8; 8];
        level.copy_from_slice(&bytes[8..16]);
        Some(FreeKey {
            witnessed_level: !u64::from_be_bytes(wl),
            level: !u64::from_be_bytes(level),
            hash: BlockHash::from_slice(&bytes[16..]),
        })
    }
}

/// Key of the `block_child` index: `(parent, child)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChildKey {
    pub parent: BlockHash,
    pub child: BlockHash,
}

impl BlockChildKey {
    pub const WIDTH: usize = 64;

    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out[..32].copy_from_slice(self.parent.as_bytes());
        out[32..].copy_from_slice(self.child.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIDTH {
            return None;
        }
        Some(BlockChildKey {
            parent: BlockHash::from_slice(&bytes[..32]),
            child: BlockHash::from_slice(&bytes[32..]),
        })
    }
}

/// Key of the `fork_successor` region of the `successor` column:
/// `(previous, successor)` pairs for quick fork discovery on admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkSuccessorKey {
    pub previous: BlockHash,
    pub successor: BlockHash,
}

impl ForkSuccessorKey {
    pub const WIDTH: usize = 64;

    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out[..32].copy_from_slice(self.previous.as_bytes());
        out[32..].copy_from_slice(self.successor.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIDTH {
            return None;
        }
        Some(ForkSuccessorKey {
            previous: BlockHash::from_slice(&bytes[..32]),
            successor: BlockHash::from_slice(&bytes[32..]),
        })
    }
}

/// Main-chain advance checkpoint stored under the `advance_info` prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvanceInfo {
    pub mci: u64,
    pub witness_block: BlockHash,
}

impl AdvanceInfo {
    pub const WIDTH: usize = 40;

    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out[..8].copy_from_slice(&self.mci.to_be_bytes());
        out[8..].copy_from_slice(self.witness_block.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIDTH {
            return None;
        }
        let mut mci = [0u8; 8];
        mci.copy_from_slice(&bytes[..8]);
        Some(AdvanceInfo {
            mci: u64::from_be_bytes(mci),
            witness_block: BlockHash::from_slice(&bytes[8..]),
        })
    }
}

/// Earliest/latest pending-unit pointers per account (`unlink_info` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnlinkInfo {
    pub earliest_unlink: BlockHash,
    pub latest_unlink: BlockHash,
}

impl UnlinkInfo {
    pub const WIDTH: usize = 64;

    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out[..32].copy_from_slice(self.earliest_unlink.as_bytes());
        out[32..].copy_from_slice(self.latest_unlink.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIDTH {
            return None;
        }
        Some(UnlinkInfo {
            earliest_unlink: BlockHash::from_slice(&bytes[..32]),
            latest_unlink: BlockHash::from_slice(&bytes[32..]),
        })
    }
}

/// `(hash, next)` chain key of the `next_unlink` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextUnlink {
    pub hash: BlockHash,
    pub next: BlockHash,
}

impl NextUnlink {
    pub const WIDTH: usize = 64;

    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out[..32].copy_from_slice(self.hash.as_bytes());
        out[32..].copy_from_slice(self.next.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIDTH {
            return None;
        }
        Some(NextUnlink {
            hash: BlockHash::from_slice(&bytes[..32]),
            next: BlockHash::from_slice(&bytes[32..]),
        })
    }
}

/// Time-ordered key of the `head_unlink` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadUnlink {
    pub time: u64,
    pub hash: BlockHash,
}

impl HeadUnlink {
    pub const WIDTH: usize = 40;

    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out[..8].copy_from_slice(&self.time.to_be_bytes());
        out[8..].copy_from_slice(self.hash.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIDTH {
            return None;
        }
        let mut time = [0u8; 8];
        time.copy_from_slice(&bytes[..8]);
        Some(HeadUnlink {
            time: u64::from_be_bytes(time),
            hash: BlockHash::from_slice(&bytes[8..]),
        })
    }
}

/// Holding form of a unit whose dependencies are unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlinkBlock {
    /// Local arrival time, seconds since epoch.
    pub time: u64,
    pub unit: Unit,
}

impl Encodable for UnlinkBlock {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.time);
        s.append(&self.unit);
    }
}

impl Decodable for UnlinkBlock {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(UnlinkBlock {
            time: rlp.val_at(0)?,
            unit: rlp.val_at(1)?,
        })
    }
}

/// Precomputed main-chain ancestors of an MC unit at exponentially spaced
/// indices (`mci - 2^i`); accelerates cross-MCI reachability queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkiplistInfo {
    /// Ancestor MC unit hashes, sorted ascending for a canonical encoding.
    pub list: Vec<H256>,
}

impl SkiplistInfo {
    pub fn new(mut list: Vec<H256>) -> Self {
        list.sort();
        list.dedup();
        SkiplistInfo { list }
    }
}

impl Encodable for SkiplistInfo {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append_list(&self.list);
    }
}

impl Decodable for SkiplistInfo {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(SkiplistInfo {
            list: rlp.as_list()?,
        })
    }
}

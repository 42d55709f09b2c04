//! # Ledger Primitives
//!
//! Fixed-width integers and hashes, the signature envelope, and Keccak-256.
//!
//! All content addressing in the ledger is Keccak-256 over the RLP form of an
//! entity. Addresses are 20 bytes; hashes are 32 bytes.

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use sha3::{Digest, Keccak256};

pub use primitive_types::{H160, H256, U256};

/// A 20-byte account address.
pub type Address = H160;

/// Identity of a unit: Keccak-256 over its RLP contents.
pub type BlockHash = H256;

/// Identity of a stabilised-unit summary.
pub type SummaryHash = H256;

/// Identity of a content-addressed account state snapshot.
pub type StateHash = H256;

/// Compute the Keccak-256 hash of `data`.
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_slice(&hasher.finalize())
}

/// Keccak-256 of the empty byte string; `code_hash` of a codeless account.
pub fn empty_code_hash() -> H256 {
    keccak256(&[])
}

/// Root hash of an empty storage trie.
pub fn empty_trie_root() -> H256 {
    keccak256(&rlp::NULL_RLP)
}

/// A 65-byte recoverable secp256k1 signature, `r ‖ s ‖ v` with `v ∈ {0, 1}`.
///
/// The recovery id is carried as-is; no 27-offset is applied anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignatureRSV {
    pub r: H256,
    pub s: H256,
    pub v: u8,
}

impl SignatureRSV {
    /// Pack into the 65-byte wire envelope.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(self.r.as_bytes());
        out[32..64].copy_from_slice(self.s.as_bytes());
        out[64] = self.v;
        out
    }

    /// Unpack from the 65-byte wire envelope.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 65 || bytes[64] > 1 {
            return None;
        }
        Some(Self {
            r: H256::from_slice(&bytes[..32]),
            s: H256::from_slice(&bytes[32..64]),
            v: bytes[64],
        })
    }

    /// True for the all-zero placeholder used by the genesis unit.
    pub fn is_zero(&self) -> bool {
        self.r.is_zero() && self.s.is_zero() && self.v == 0
    }
}

impl Encodable for SignatureRSV {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.to_bytes().to_vec());
    }
}

impl Decodable for SignatureRSV {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        let bytes: Vec<u8> = rlp.as_val()?;
        Self::from_bytes(&bytes).ok_or(DecoderError::Custom("bad signature envelope"))
    }
}

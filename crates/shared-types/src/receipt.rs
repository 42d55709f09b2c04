//! # Receipts and Logs
//!
//! A [`Receipt`] records the outcome of executing a light unit's linked
//! transaction at stabilisation: the sender's resulting account-state hash,
//! the state hashes of every other touched account, gas used, a 2048-bit log
//! bloom and the ordered log entries. Receipts are content-addressed.

use crate::primitives::{keccak256, Address, StateHash, H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Width of the log bloom in bytes.
pub const BLOOM_BYTES: usize = 256;

/// A 2048-bit bloom filter over log addresses and topics (M3:2048 scheme).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LogBloom(pub [u8; BLOOM_BYTES]);

impl LogBloom {
    /// The empty bloom.
    pub fn zero() -> Self {
        LogBloom([0u8; BLOOM_BYTES])
    }

    /// Fold `input` into the bloom: three 11-bit positions taken from the
    /// Keccak-256 of the input.
    pub fn accrue(&mut self, input: &[u8]) {
        let hash = keccak256(input);
        let bytes = hash.as_bytes();
        for i in 0..3 {
            let bit = (((bytes[2 * i] as usize) << 8) | bytes[2 * i + 1] as usize) % 2048;
            self.0[BLOOM_BYTES - 1 - bit / 8] |= 1 << (bit % 8);
        }
    }

    /// Fold a whole log entry (address + every topic) into the bloom.
    pub fn accrue_log(&mut self, log: &LogEntry) {
        self.accrue(log.address.as_bytes());
        for topic in &log.topics {
            self.accrue(topic.as_bytes());
        }
    }

    /// True if every bit of the bloom of `input` is set here.
    pub fn contains_input(&self, input: &[u8]) -> bool {
        let mut single = LogBloom::zero();
        single.accrue(input);
        self.contains(&single)
    }

    /// True if every set bit of `other` is also set here.
    pub fn contains(&self, other: &LogBloom) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| a & b == *b)
    }

    /// Union with another bloom.
    pub fn accrue_bloom(&mut self, other: &LogBloom) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a |= b;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for LogBloom {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Debug for LogBloom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LogBloom(0x{})", hex::encode(self.0))
    }
}

impl Encodable for LogBloom {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.0.to_vec());
    }
}

impl Decodable for LogBloom {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        let bytes: Vec<u8> = rlp.as_val()?;
        if bytes.len() != BLOOM_BYTES {
            return Err(DecoderError::Custom("bad bloom width"));
        }
        let mut out = [0u8; BLOOM_BYTES];
        out.copy_from_slice(&bytes);
        Ok(LogBloom(out))
    }
}

/// A single log emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

impl Encodable for LogEntry {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.address);
        s.append_list(&self.topics);
        s.append(&self.data);
    }
}

impl Decodable for LogEntry {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(LogEntry {
            address: rlp.val_at(0)?,
            topics: rlp.list_at(1)?,
            data: rlp.val_at(2)?,
        })
    }
}

/// Execution outcome of a stabilised light unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Account-state hash of the sender after execution.
    pub from_state: StateHash,
    /// Account-state hashes of every other account the transaction touched,
    /// sorted ascending for a canonical encoding.
    pub to_states: Vec<StateHash>,
    pub gas_used: U256,
    pub bloom: LogBloom,
    pub logs: Vec<LogEntry>,
}

impl Receipt {
    /// Build a receipt, deriving the bloom from the logs.
    pub fn new(from_state: StateHash, mut to_states: Vec<StateHash>, gas_used: U256, logs: Vec<LogEntry>) -> Self {
        to_states.sort();
        to_states.dedup();
        let mut bloom = LogBloom::zero();
        for log in &logs {
            bloom.accrue_log(log);
        }
        Receipt {
            from_state,
            to_states,
            gas_used,
            bloom,
            logs,
        }
    }

    /// Content hash of the receipt.
    pub fn hash(&self) -> H256 {
        keccak256(&rlp::encode(self))
    }

    /// Bloom membership probe for a 32-byte value (address or topic hash).
    pub fn contains_bloom(&self, value: &H256) -> bool {
        self.bloom.contains_input(value.as_bytes())
    }
}

impl Encodable for Receipt {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(5);
        s.append(&self.from_state);
        s.append_list(&self.to_states);
        s.append(&self.gas_used);
        s.append(&self.bloom);
        s.append_list(&self.logs);
    }
}

impl Decodable for Receipt {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 5 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Receipt {
            from_state: rlp.val_at(0)?,
            to_states: rlp.list_at(1)?,
            gas_used: rlp.val_at(2)?,
            bloom: rlp.val_at(3)?,
            logs: rlp.list_at(4)?,
        })
    }
}

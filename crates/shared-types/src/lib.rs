//! # Shared Types Crate
//!
//! The ledger data model shared across subsystems. All cross-subsystem
//! entities are defined here together with their RLP wire forms; identity of
//! every content-addressed record is the Keccak-256 hash of its RLP encoding.
//!
//! ## Clusters
//!
//! - **Primitives**: `Address`, `BlockHash`, `U256`, the 65-byte signature
//!   envelope, Keccak hashing.
//! - **DAG**: [`Unit`], [`UnitState`], [`SkiplistInfo`] and the composite
//!   store keys ([`FreeKey`], [`BlockChildKey`], ...).
//! - **Accounts**: [`AccountInfo`], [`DagAccountInfo`], [`AccountState`].
//! - **Execution**: [`Receipt`], [`LogEntry`], [`LogBloom`], [`Trace`].
//! - **Witnessing**: [`Approve`], [`ApproveReceipt`], [`EpochRecord`].

pub mod account;
pub mod approve;
pub mod keys;
pub mod primitives;
pub mod receipt;
pub mod trace;
pub mod transaction;
pub mod unit;
pub mod unit_state;

pub use account::{AccountInfo, AccountState, DagAccountInfo};
pub use approve::{next_epoch_seed, Approve, ApproveReceipt, EpochRecord};
pub use keys::{
    AdvanceInfo, BlockChildKey, ForkSuccessorKey, FreeKey, HeadUnlink, NextUnlink, SkiplistInfo,
    UnlinkBlock, UnlinkInfo,
};
pub use primitives::{
    empty_code_hash, empty_trie_root, keccak256, Address, BlockHash, SignatureRSV, StateHash,
    SummaryHash, H256, U256,
};
pub use receipt::{LogBloom, LogEntry, Receipt};
pub use trace::{Trace, TraceAction, TraceList, TraceResult};
pub use transaction::Transaction;
pub use unit::{Unit, UnitType};
pub use unit_state::{BlockStatus, UnitState};

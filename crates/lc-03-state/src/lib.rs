//! # State Crate
//!
//! The account and storage layer.
//!
//! ## Shape
//!
//! - [`AccountEntry`]: the mutable overlay of one account during a single
//!   transaction (storage overlay, original-value cache, code cache, balance
//!   and nonce scratch). Entries live only inside a [`StateLedger`].
//! - [`StateLedger`]: the explicit execution context passed through the call
//!   stack. Reads fall through overlay → original cache → flat storage;
//!   checkpoints support frame-level revert.
//! - Commit produces a fresh content-addressed
//!   [`AccountState`](shared_types::AccountState) per touched account,
//!   chained to its predecessor, with a Merkle-Patricia storage root.

pub mod account_entry;
pub mod errors;
pub mod ledger;
pub mod storage_trie;

pub use account_entry::AccountEntry;
pub use errors::StateError;
pub use ledger::{CommitOutcome, StateLedger};
pub use storage_trie::storage_root;

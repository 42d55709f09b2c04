//! # State Error Types

use lc_01_ledger_store::StoreError;
use thiserror::Error;

/// Errors raised by the account/storage layer.
#[derive(Debug, Clone, Error)]
pub enum StateError {
    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Code bytes supplied for an account do not match its code hash.
    #[error("Code hash mismatch for {address}")]
    CodeMismatch { address: String },

    /// A checkpoint operation had no matching checkpoint.
    #[error("No open checkpoint")]
    NoCheckpoint,
}

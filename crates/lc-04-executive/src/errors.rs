//! # Execution Error Taxonomy
//!
//! [`TransactionException`] is the recorded outcome classification; it is a
//! value stored in receipts, never a thrown object. [`ExecutiveError`] is the
//! infrastructure failure path (store/state I/O) that does abort admission.

use lc_03_state::StateError;
use thiserror::Error;

/// Why a transaction failed (or `None` when it did not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransactionException {
    #[error("none")]
    None,
    #[error("unknown failure")]
    Unknown,
    #[error("bad RLP")]
    BadRlp,
    #[error("invalid format")]
    InvalidFormat,
    /// Too little gas to pay for the intrinsic transaction cost.
    #[error("out of gas (intrinsic)")]
    OutOfGasIntrinsic,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid nonce")]
    InvalidNonce,
    #[error("not enough cash")]
    NotEnoughCash,
    /// Too little gas to pay for the base frame cost.
    #[error("out of gas (base)")]
    OutOfGasBase,
    #[error("block gas limit reached")]
    BlockGasLimitReached,
    #[error("bad instruction")]
    BadInstruction,
    #[error("bad jump destination")]
    BadJumpDestination,
    /// Ran out of gas executing code.
    #[error("out of gas")]
    OutOfGas,
    /// Ran out of stack executing code.
    #[error("out of stack")]
    OutOfStack,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("revert")]
    RevertInstruction,
    #[error("invalid zero-signature format")]
    InvalidZeroSignatureFormat,
    /// The computed contract address is already occupied.
    #[error("address already used")]
    AddressAlreadyUsed,
}

impl TransactionException {
    /// True when execution completed without exception.
    pub fn is_none(self) -> bool {
        matches!(self, TransactionException::None)
    }
}

/// Infrastructure failures during execution; these abort the admission
/// transaction, unlike [`TransactionException`].
#[derive(Debug, Clone, Error)]
pub enum ExecutiveError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Store(#[from] lc_01_ledger_store::StoreError),
}

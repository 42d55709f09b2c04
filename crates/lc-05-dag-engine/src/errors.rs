//! # DAG Error Types

use thiserror::Error;

/// Errors raised by the consensus core.
#[derive(Debug, Clone, Error)]
pub enum DagError {
    /// Underlying store failure; aborts the admission transaction.
    #[error(transparent)]
    Store(#[from] lc_01_ledger_store::StoreError),

    /// A unit broke a structural invariant; it is recorded as invalid.
    #[error("Invalid unit: {0}")]
    Invalid(String),

    /// A referenced unit is not in the store. Admission preconditions
    /// guarantee parents; hitting this mid-walk means corruption.
    #[error("Unknown unit {0} during traversal")]
    UnknownUnit(String),

    /// The witness set for an epoch is missing.
    #[error("No epoch record for epoch {0}")]
    MissingEpoch(u64),

    /// A reorg attempted to cross the stability line.
    #[error("Reorg below stable MCI {stable} (divergence at {divergence})")]
    ReorgBelowStable { stable: u64, divergence: u64 },

    /// Stable-execution callback failure.
    #[error("Stable execution failed: {0}")]
    Execution(String),
}

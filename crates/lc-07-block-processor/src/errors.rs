//! # Processor Error Types

use thiserror::Error;

/// Failures on the write path. `Store` failures abort the whole admission
/// batch; the caller retries the logical operation.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Store(#[from] lc_01_ledger_store::StoreError),

    #[error(transparent)]
    Dag(#[from] lc_05_dag_engine::DagError),

    #[error(transparent)]
    State(#[from] lc_03_state::StateError),

    #[error("Epoch election failed: {0}")]
    Election(String),

    #[error("Processor queue closed")]
    QueueClosed,
}

//! # DAG Engine Crate
//!
//! The consensus core of the ledger. Admission computes a unit's DAG
//! position (level, best parent, witnessed level) and maintains the free and
//! child indices; the main chain is re-derived from the best tip after every
//! admission; the stability rule promotes main-chain units — and everything
//! they include — into the total stabilisation order.
//!
//! The engine works strictly through the store transaction it is handed, so
//! it always reads its own in-flight writes; cache coherence is the block
//! processor's concern.

pub mod chain;
pub mod config;
pub mod errors;
pub mod stability;
pub mod summary;
pub mod validation;

pub use chain::{AdmitOutcome, DagChain, TouchedKeys};
pub use config::DagConfig;
pub use errors::DagError;
pub use stability::{StableExecutionOutcome, StableExecutor};
pub use summary::gen_summary;

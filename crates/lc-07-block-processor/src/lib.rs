//! # Block Processor Crate
//!
//! The write path of the node. All ledger mutations happen on one processor
//! at a time, each admission under a single store transaction with the
//! block-cache changing-set barrier around the commit:
//!
//! 1. structural/signature validation,
//! 2. dependency triage — anything missing parks the unit in the unhandled
//!    cache and persists its unlink bookkeeping,
//! 3. DAG admission, main-chain advance, stabilisation and stable execution,
//! 4. mark changing → commit → evict → clear,
//! 5. release of pending units keyed on the admitted hash.

pub mod errors;
pub mod executor;
pub mod item;
pub mod pools;
pub mod processor;
pub mod service;

pub use errors::ProcessError;
pub use executor::LinkExecutor;
pub use item::{ItemSource, ProcessItem};
pub use pools::{ApprovePool, TransactionPool};
pub use processor::{BlockProcessor, EpochElector, NullElector, ProcessOutcome};
pub use service::{channel, spawn, ProcessorHandle, ProcessorQueue};

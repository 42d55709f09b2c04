//! # Witness / Epoch Crate
//!
//! Governance of main-chain stabilisation: a rotating witness committee
//! elected from on-chain approve messages.
//!
//! - [`EpochManager`]: runs the deterministic election when a stabilised MCI
//!   closes an epoch, and answers the epoch introspection queries
//!   (`epoch_approves`, `epoch_approve_receipts`,
//!   `epoch_elected_approve_receipts`, `witness_list`).
//! - [`WitnessActor`]: the optional local operator role — on a jittered
//!   interval it checks the gating conditions and, when warranted, composes,
//!   signs and submits a new unit citing the current tips.

pub mod actor;
pub mod election;

pub use actor::{WitnessActor, WitnessConfig};
pub use election::EpochManager;

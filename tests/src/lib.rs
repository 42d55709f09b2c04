//! # Lattice-Chain Test Suite
//!
//! Cross-crate consensus scenarios and ledger-wide invariant sweeps over a
//! real store. The [`harness`] module builds a complete write path — store,
//! cache, DAG chain, pools, unhandled cache, executive and processor — on a
//! temporary database.

pub mod harness;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod scenarios;

//! # Node Runtime
//!
//! Wires the subsystem crates into a running node: configuration, genesis
//! installation, the processor queue and the optional witness actor.

pub mod config;
pub mod genesis;
pub mod node;

pub use config::{NodeConfig, StorageConfig};
pub use genesis::{GenesisAccount, GenesisConfig};
pub use node::{Node, NodeTasks};

//! # Ledger Store Crate
//!
//! Persistence for the DAG ledger: a column-partitioned RocksDB database with
//! write-batched transactions, read-your-writes snapshot reads, forward and
//! reverse iterators, range delete, and named 64-bit counters.
//!
//! ## Layering
//!
//! - [`Database`]: column families, tuning, open/repair.
//! - [`DbTransaction`]: one logical ledger operation — a snapshot plus a
//!   buffered write set. Reads see the snapshot overlaid with the
//!   transaction's own prior writes. `commit` flushes atomically; dropping
//!   without commit discards everything.
//! - [`LedgerStore`]: typed accessors per column plus the global props.
//!
//! Exactly one mutating transaction exists at a time (the block processor's);
//! readers may hold any number of snapshot transactions concurrently.

pub mod columns;
pub mod database;
pub mod errors;
pub mod store;
pub mod transaction;

pub use columns::Column;
pub use database::{Database, DatabaseConfig};
pub use errors::StoreError;
pub use store::{
    LedgerStore, Prop, COUNT_BLOCK, COUNT_DAG_FREE, COUNT_STABLE_BLOCK, COUNT_UNLINK,
};
pub use transaction::DbTransaction;

//! # Store Error Types

use thiserror::Error;

/// Errors surfaced by the ledger store.
///
/// `Open` and `Corruption` are fatal: the process must not continue against a
/// database it cannot trust. Write failures poison the whole transaction; the
/// caller retries the logical operation from scratch.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The database could not be opened.
    #[error("Store open failed: {0}")]
    Open(String),

    /// An on-disk record failed to decode; the store is not trustworthy.
    #[error("Store corruption: {0}")]
    Corruption(String),

    /// A read or write against RocksDB failed.
    #[error("Store I/O error: {0}")]
    Io(String),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<rlp::DecoderError> for StoreError {
    fn from(e: rlp::DecoderError) -> Self {
        StoreError::Corruption(format!("rlp decode: {e}"))
    }
}

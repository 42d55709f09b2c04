//! # Database
//!
//! RocksDB with one column family per [`Column`], tuned for blockchain
//! workloads: snappy compression, shared LRU block cache, bloom filters, and
//! fixed-length prefix extractors on hash/address-keyed columns.

use crate::columns::Column;
use crate::errors::StoreError;
use crate::transaction::DbTransaction;
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamily, ColumnFamilyDescriptor, Options, SliceTransform, DB,
};
use std::path::Path;

/// Database tuning knobs.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Shared block cache size in bytes (default: 256MB).
    pub block_cache_size: usize,
    /// Per-column write buffer size in bytes (default: 64MB).
    pub write_buffer_size: usize,
    /// Maximum number of write buffers (default: 3).
    pub max_write_buffer_number: i32,
    /// Enable fsync after each committed batch (default: true).
    pub sync_writes: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            block_cache_size: 256 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }
}

impl DatabaseConfig {
    /// Config for testing: small buffers, no fsync.
    pub fn for_testing() -> Self {
        Self {
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: false,
        }
    }
}

/// The column-partitioned ledger database.
pub struct Database {
    db: DB,
    config: DatabaseConfig,
}

impl Database {
    /// Open or create the database with every ledger column.
    ///
    /// Corruption at open is fatal and surfaces as [`StoreError::Open`].
    pub fn open(path: impl AsRef<Path>, config: DatabaseConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let cache = Cache::new_lru_cache(config.block_cache_size);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = Column::ALL
            .iter()
            .map(|col| {
                let mut block_opts = BlockBasedOptions::default();
                block_opts.set_bloom_filter(10.0, false);
                block_opts.set_block_cache(&cache);

                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                cf_opts.set_block_based_table_factory(&block_opts);
                if let Some(width) = col.fixed_key_prefix() {
                    cf_opts.set_prefix_extractor(SliceTransform::create_fixed_prefix(width));
                    cf_opts.set_memtable_prefix_bloom_ratio(0.02);
                }
                ColumnFamilyDescriptor::new(col.name(), cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Open(e.to_string()))?;

        tracing::info!(target: "lc::store", path = %path.as_ref().display(), "ledger database open");
        Ok(Self { db, config })
    }

    /// Begin a transaction: a snapshot plus an empty write set.
    pub fn begin_transaction(&self) -> DbTransaction<'_> {
        DbTransaction::new(self)
    }

    pub(crate) fn cf(&self, col: Column) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(col.name())
            .ok_or_else(|| StoreError::Corruption(format!("missing column family {}", col.name())))
    }

    pub(crate) fn inner(&self) -> &DB {
        &self.db
    }

    pub(crate) fn sync_writes(&self) -> bool {
        self.config.sync_writes
    }
}

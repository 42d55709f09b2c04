//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters, JSON
//! deserialisable. Every section has sane defaults; a missing config file
//! yields a default node.

use lattice_telemetry::TelemetryConfig;
use lc_01_ledger_store::DatabaseConfig;
use lc_05_dag_engine::DagConfig;
use lc_08_witness_epoch::WitnessConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage location and tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database directory.
    pub data_dir: PathBuf,
    /// fsync each committed batch.
    pub sync_writes: bool,
    /// Shared block cache, megabytes.
    pub block_cache_mb: usize,
    /// Per-column write buffer, megabytes.
    pub write_buffer_mb: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/lattice"),
            sync_writes: true,
            block_cache_mb: 256,
            write_buffer_mb: 64,
        }
    }
}

impl StorageConfig {
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            block_cache_size: self.block_cache_mb * 1024 * 1024,
            write_buffer_size: self.write_buffer_mb * 1024 * 1024,
            sync_writes: self.sync_writes,
            ..DatabaseConfig::default()
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub storage: StorageConfig,
    pub dag: DagConfig,
    pub witness: WitnessConfig,
    pub telemetry: TelemetryConfig,
    /// Capacity of the unhandled cache, in pending units.
    pub unhandled_capacity: usize,
    /// Hex secret key of the local witness account, when `witness.is_witness`.
    pub witness_secret: Option<String>,
}

impl NodeConfig {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::with_defaults());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: NodeConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// The defaults (the `Default` derive leaves `unhandled_capacity` zero).
    pub fn with_defaults() -> Self {
        Self {
            unhandled_capacity: 100_000,
            ..Self::default()
        }
    }

    /// The effective unhandled-cache capacity.
    pub fn effective_unhandled_capacity(&self) -> usize {
        if self.unhandled_capacity == 0 {
            100_000
        } else {
            self.unhandled_capacity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = NodeConfig::with_defaults();
        assert_eq!(config.effective_unhandled_capacity(), 100_000);
        assert_eq!(config.dag.witness_count, 14);
        assert!(!config.witness.is_witness);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: NodeConfig =
            serde_json::from_str(r#"{"unhandled_capacity": 500}"#).unwrap();
        assert_eq!(config.effective_unhandled_capacity(), 500);
        assert_eq!(config.dag.majority, 8);
    }
}

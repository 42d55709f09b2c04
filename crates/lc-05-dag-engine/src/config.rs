//! # DAG Configuration
//!
//! The consensus parameters. The witness committee size, its majority and
//! the stability distance are genesis-settable; the defaults below are the
//! production values.

use serde::{Deserialize, Serialize};

/// Consensus parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagConfig {
    /// Size of the witness committee.
    pub witness_count: usize,
    /// Witnesses that constitute a majority.
    pub majority: usize,
    /// Minimum `witnessed_level(v) - level(u)` before `v` can stabilise `u`.
    pub threshold_distance: u64,
    /// Epoch length in main-chain indices.
    pub epoch_period: u64,
}

impl Default for DagConfig {
    fn default() -> Self {
        let witness_count = 14;
        Self {
            witness_count,
            majority: witness_count / 2 + 1,
            threshold_distance: 8,
            epoch_period: 10_000,
        }
    }
}

impl DagConfig {
    /// Parameters scaled down for tests: a small committee and a short
    /// stability distance so scenarios stay compact.
    pub fn for_testing(witness_count: usize, threshold_distance: u64, epoch_period: u64) -> Self {
        Self {
            witness_count,
            majority: witness_count / 2 + 1,
            threshold_distance,
            epoch_period,
        }
    }

    /// The epoch an MCI belongs to.
    pub fn epoch_of_mci(&self, mci: u64) -> u64 {
        mci / self.epoch_period
    }

    /// True when stabilising `mci` closes an epoch.
    pub fn is_epoch_boundary(&self, mci: u64) -> bool {
        mci > 0 && mci % self.epoch_period == 0
    }
}

//! # Processor Jobs

use shared_types::Unit;

/// Where a unit came from; locally composed units take the fast queue and
/// sync items are exempt from some liveness accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    /// Relayed by a peer during normal operation.
    Broadcast,
    /// Fetched during catch-up.
    Sync,
    /// Composed by the local witness actor.
    Local,
}

/// One admission job.
#[derive(Debug, Clone)]
pub struct ProcessItem {
    pub unit: Unit,
    pub source: ItemSource,
    /// Local arrival time, seconds since epoch.
    pub arrival_time: u64,
}

impl ProcessItem {
    pub fn new(unit: Unit, source: ItemSource, arrival_time: u64) -> Self {
        Self {
            unit,
            source,
            arrival_time,
        }
    }

    pub fn is_local(&self) -> bool {
        self.source == ItemSource::Local
    }
}

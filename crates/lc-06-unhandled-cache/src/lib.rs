//! # Unhandled Cache Crate
//!
//! Units whose parents, linked transactions or approves have not arrived yet
//! wait here. The cache is a dependency DAG over the pending units:
//!
//! - `dependencies`, `transactions`, `approves`: reverse maps from a missing
//!   hash to the pending units waiting on it;
//! - `missings` / `light_missings` / `approve_missings`: the hashes unknown
//!   to the node, which feed retransmission requests;
//! - `tips`: pending units no other pending unit waits on — the eviction
//!   frontier under capacity pressure.
//!
//! A single mutex guards all maps; every public operation is atomic.

use parking_lot::Mutex;
use rand::Rng;
use shared_types::{BlockHash, H256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Queries against the local transaction/approve pools; the cache asks them
/// before recording a payload hash as missing.
pub trait PayloadPool: Send + Sync {
    fn contains(&self, hash: &H256) -> bool;
    /// Snapshot of every hash the pool knows.
    fn known(&self) -> HashSet<H256>;
}

/// Outcome of [`UnhandledCache::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    /// Every dependency is already resolved — reprocess the unit now.
    Retry,
    /// Already pending, rejected under capacity pressure, or accepted with
    /// nothing new to request.
    Exist,
    /// Accepted; the returned missing hashes should be requested.
    Success,
}

/// Missing hashes to request from peers.
#[derive(Debug, Clone, Default)]
pub struct MissingSet {
    pub blocks: Vec<BlockHash>,
    pub transactions: Vec<H256>,
    pub approves: Vec<H256>,
}

/// One pending unit and the hashes it still waits for.
#[derive(Debug, Clone)]
struct UnhandledItem<T> {
    item: T,
    dependency_hashes: HashSet<BlockHash>,
    transactions: HashSet<H256>,
    approves: HashSet<H256>,
}

#[derive(Default)]
struct Maps<T> {
    unhandled: HashMap<BlockHash, UnhandledItem<T>>,
    dependencies: HashMap<BlockHash, HashSet<BlockHash>>,
    transactions: HashMap<H256, HashSet<BlockHash>>,
    approves: HashMap<H256, HashSet<BlockHash>>,
    missings: HashSet<BlockHash>,
    light_missings: HashSet<H256>,
    approve_missings: HashSet<H256>,
    tips: HashSet<BlockHash>,
}

/// Number of pending hashes sampled as synthetic missings when the real
/// missing set is empty but units are still pending (post-restart state).
const SYNTHETIC_SAMPLE: usize = 50;

/// Bounded cache of not-yet-admissible units. `T` is the processor job type
/// returned on release.
pub struct UnhandledCache<T> {
    maps: Mutex<Maps<T>>,
    capacity: usize,
    /// Tips examined before giving up and evicting the first one.
    max_search_count: usize,
    tx_pool: std::sync::Arc<dyn PayloadPool>,
    approve_pool: std::sync::Arc<dyn PayloadPool>,
    exist_count: AtomicU64,
    full_count: AtomicU64,
    ok_count: AtomicU64,
}

impl<T: Clone> UnhandledCache<T> {
    pub fn new(
        tx_pool: std::sync::Arc<dyn PayloadPool>,
        approve_pool: std::sync::Arc<dyn PayloadPool>,
        capacity: usize,
    ) -> Self {
        Self {
            maps: Mutex::new(Maps {
                unhandled: HashMap::new(),
                dependencies: HashMap::new(),
                transactions: HashMap::new(),
                approves: HashMap::new(),
                missings: HashSet::new(),
                light_missings: HashSet::new(),
                approve_missings: HashSet::new(),
                tips: HashSet::new(),
            }),
            capacity,
            max_search_count: 10,
            tx_pool,
            approve_pool,
            exist_count: AtomicU64::new(0),
            full_count: AtomicU64::new(0),
            ok_count: AtomicU64::new(0),
        }
    }

    /// Hold `item` (the processor job for unit `hash`) until the given block
    /// dependencies, transactions and approves are all present.
    pub fn add(
        &self,
        hash: BlockHash,
        dependency_hashes: HashSet<BlockHash>,
        transactions: HashSet<H256>,
        approves: HashSet<H256>,
        item: T,
    ) -> AddResult {
        debug_assert!(!dependency_hashes.contains(&hash));

        // payloads may have arrived between validation and this call
        let transactions: HashSet<H256> = transactions
            .into_iter()
            .filter(|h| !self.tx_pool.contains(h))
            .collect();
        let approves: HashSet<H256> = approves
            .into_iter()
            .filter(|h| !self.approve_pool.contains(h))
            .collect();
        if dependency_hashes.is_empty() && transactions.is_empty() && approves.is_empty() {
            return AddResult::Retry;
        }

        let mut maps = self.maps.lock();
        if maps.unhandled.contains_key(&hash) {
            self.exist_count.fetch_add(1, Ordering::Relaxed);
            return AddResult::Exist;
        }

        // above half capacity, refuse units that would introduce new
        // unknown block dependencies
        if maps.unhandled.len() >= self.capacity / 2 {
            let introduces_unknown = dependency_hashes
                .iter()
                .any(|dep| !maps.unhandled.contains_key(dep) && !maps.missings.contains(dep));
            if introduces_unknown {
                self.full_count.fetch_add(1, Ordering::Relaxed);
                return AddResult::Exist;
            }
        }

        self.ok_count.fetch_add(1, Ordering::Relaxed);

        if !maps.dependencies.contains_key(&hash) {
            maps.tips.insert(hash);
        }

        let mut all_deps_pending = true;
        for dep in &dependency_hashes {
            maps.dependencies.entry(*dep).or_default().insert(hash);
            if !maps.unhandled.contains_key(dep) {
                maps.missings.insert(*dep);
                all_deps_pending = false;
            }
            maps.tips.remove(dep);
        }
        for h in &transactions {
            maps.transactions.entry(*h).or_default().insert(hash);
            maps.light_missings.insert(*h);
        }
        for h in &approves {
            maps.approves.entry(*h).or_default().insert(hash);
            maps.approve_missings.insert(*h);
        }

        let no_payload_waits = transactions.is_empty() && approves.is_empty();
        maps.unhandled.insert(
            hash,
            UnhandledItem {
                item,
                dependency_hashes,
                transactions,
                approves,
            },
        );

        if maps.unhandled.len() > self.capacity {
            self.evict_one(&mut maps);
        }

        // everything this unit waits for is already pending — nothing new
        // for the peer set to re-send
        if all_deps_pending && no_payload_waits {
            return AddResult::Exist;
        }
        AddResult::Success
    }

    /// A unit arrived: release every pending unit that waited on it. Units
    /// with no remaining waits are returned for reprocessing.
    pub fn release_dependency(&self, dependency_hash: &BlockHash) -> Vec<T> {
        let mut maps = self.maps.lock();
        let mut released = Vec::new();

        if let Some(waiters) = maps.dependencies.remove(dependency_hash) {
            for waiter in waiters {
                let done = match maps.unhandled.get_mut(&waiter) {
                    Some(pending) => {
                        pending.dependency_hashes.remove(dependency_hash);
                        pending.dependency_hashes.is_empty()
                            && pending.transactions.is_empty()
                            && pending.approves.is_empty()
                    }
                    None => {
                        tracing::warn!(target: "lc::unhandled", waiter = ?waiter, "waiter missing from pending map");
                        false
                    }
                };
                if done {
                    if let Some(pending) = maps.unhandled.get(&waiter) {
                        released.push(pending.item.clone());
                    }
                    Self::detach(&mut maps, &waiter);
                    maps.unhandled.remove(&waiter);
                    maps.tips.remove(&waiter);
                }
            }
            maps.missings.remove(dependency_hash);
        }

        // the dependency itself may have been pending; it is admitted now
        if maps.unhandled.contains_key(dependency_hash) {
            Self::detach(&mut maps, dependency_hash);
            maps.unhandled.remove(dependency_hash);
            maps.tips.remove(dependency_hash);
        }
        released
    }

    /// Transactions arrived.
    pub fn release_transaction_dependency(
        &self,
        hashes: impl IntoIterator<Item = H256>,
    ) -> Vec<T> {
        let mut maps = self.maps.lock();
        let mut released = Vec::new();
        for h in hashes {
            let Some(waiters) = maps.transactions.remove(&h) else {
                continue;
            };
            for waiter in waiters {
                let done = match maps.unhandled.get_mut(&waiter) {
                    Some(pending) => {
                        pending.transactions.remove(&h);
                        pending.dependency_hashes.is_empty()
                            && pending.transactions.is_empty()
                            && pending.approves.is_empty()
                    }
                    None => false,
                };
                if done {
                    if let Some(pending) = maps.unhandled.get(&waiter) {
                        released.push(pending.item.clone());
                    }
                    Self::detach(&mut maps, &waiter);
                    maps.unhandled.remove(&waiter);
                    maps.tips.remove(&waiter);
                }
            }
            maps.light_missings.remove(&h);
        }
        released
    }

    /// An approve arrived.
    pub fn release_approve_dependency(&self, hash: &H256) -> Vec<T> {
        let mut maps = self.maps.lock();
        let mut released = Vec::new();
        let Some(waiters) = maps.approves.remove(hash) else {
            return released;
        };
        for waiter in waiters {
            let done = match maps.unhandled.get_mut(&waiter) {
                Some(pending) => {
                    pending.approves.remove(hash);
                    pending.dependency_hashes.is_empty()
                        && pending.transactions.is_empty()
                        && pending.approves.is_empty()
                }
                None => false,
            };
            if done {
                if let Some(pending) = maps.unhandled.get(&waiter) {
                    released.push(pending.item.clone());
                }
                Self::detach(&mut maps, &waiter);
                maps.unhandled.remove(&waiter);
                maps.tips.remove(&waiter);
            }
        }
        maps.approve_missings.remove(hash);
        released
    }

    /// Sample missing hashes for retransmission: up to `limit` blocks, up to
    /// `limit/4` approves, the remainder transactions. A random starting
    /// offset spreads the load across repeated calls. When nothing is
    /// recorded missing but units are still pending, a sample of pending
    /// hashes is returned so peers re-advertise them.
    pub fn get_missings(&self, limit: usize) -> MissingSet {
        let maps = self.maps.lock();
        let mut out = MissingSet::default();

        if maps.missings.is_empty() && !maps.unhandled.is_empty() {
            let pending: Vec<BlockHash> = maps.unhandled.keys().copied().collect();
            out.blocks = sample_from(&pending, SYNTHETIC_SAMPLE.min(limit), |_| true);
        } else {
            let missings: Vec<BlockHash> = maps.missings.iter().copied().collect();
            out.blocks = sample_from(&missings, limit, |h| !maps.unhandled.contains_key(h));
        }

        let light_limit = limit.saturating_sub(out.blocks.len());
        let knowns = self.tx_pool.known();
        let lights: Vec<H256> = maps.light_missings.iter().copied().collect();
        out.transactions = sample_from(&lights, light_limit, |h| !knowns.contains(h));

        let approve_limit = limit / 4;
        let approves: Vec<H256> = maps.approve_missings.iter().copied().collect();
        out.approves = sample_from(&approves, approve_limit, |_| true);

        out
    }

    pub fn exists(&self, hash: &BlockHash) -> bool {
        self.maps.lock().unhandled.contains_key(hash)
    }

    pub fn unhandled_size(&self) -> usize {
        self.maps.lock().unhandled.len()
    }

    pub fn dependency_size(&self) -> usize {
        self.maps.lock().dependencies.len()
    }

    pub fn missing_size(&self) -> usize {
        self.maps.lock().missings.len()
    }

    pub fn light_missing_size(&self) -> usize {
        self.maps.lock().light_missings.len()
    }

    pub fn approve_missing_size(&self) -> usize {
        self.maps.lock().approve_missings.len()
    }

    pub fn tips_size(&self) -> usize {
        self.maps.lock().tips.len()
    }

    /// One line of container sizes and admission stats for the operator log.
    pub fn report_container_sizes(&self) -> String {
        let maps = self.maps.lock();
        format!(
            "unhandled:{}, dependencies:{}, missings:{}, light_missings:{}, approve_missings:{}, tips:{}, ok:{}, exist:{}, full:{}",
            maps.unhandled.len(),
            maps.dependencies.len(),
            maps.missings.len(),
            maps.light_missings.len(),
            maps.approve_missings.len(),
            maps.tips.len(),
            self.ok_count.load(Ordering::Relaxed),
            self.exist_count.load(Ordering::Relaxed),
            self.full_count.load(Ordering::Relaxed),
        )
    }

    /// Remove `hash` from every reverse map it participates in, restoring
    /// tip status to dependencies nobody else waits on.
    fn detach(maps: &mut Maps<T>, hash: &BlockHash) {
        let Some(item) = maps.unhandled.get(hash) else {
            return;
        };
        let deps: Vec<BlockHash> = item.dependency_hashes.iter().copied().collect();
        let txs: Vec<H256> = item.transactions.iter().copied().collect();
        let aps: Vec<H256> = item.approves.iter().copied().collect();

        for dep in deps {
            if let Some(waiters) = maps.dependencies.get_mut(&dep) {
                waiters.remove(hash);
                if waiters.is_empty() {
                    maps.dependencies.remove(&dep);
                    maps.missings.remove(&dep);
                    if maps.unhandled.contains_key(&dep) {
                        maps.tips.insert(dep);
                    }
                }
            }
        }
        for h in txs {
            if let Some(waiters) = maps.transactions.get_mut(&h) {
                waiters.remove(hash);
                if waiters.is_empty() {
                    maps.transactions.remove(&h);
                    maps.light_missings.remove(&h);
                }
            }
        }
        for h in aps {
            if let Some(waiters) = maps.approves.get_mut(&h) {
                waiters.remove(hash);
                if waiters.is_empty() {
                    maps.approves.remove(&h);
                    maps.approve_missings.remove(&h);
                }
            }
        }
    }

    /// Drop one tip to get back under capacity. Prefers a tip with no
    /// outstanding unknown block/transaction dependencies, examining at most
    /// `max_search_count` candidates before evicting the first tip.
    fn evict_one(&self, maps: &mut Maps<T>) {
        let tips: Vec<BlockHash> = maps.tips.iter().copied().collect();
        if tips.is_empty() {
            return;
        }
        let mut victim = tips[0];
        for (searched, tip) in tips.iter().enumerate() {
            if searched >= self.max_search_count {
                break;
            }
            let has_missings = match maps.unhandled.get(tip) {
                Some(item) => {
                    item.dependency_hashes
                        .iter()
                        .any(|dep| maps.missings.contains(dep))
                        || item
                            .transactions
                            .iter()
                            .any(|h| maps.light_missings.contains(h))
                }
                None => false,
            };
            if !has_missings {
                victim = *tip;
                break;
            }
        }
        tracing::debug!(target: "lc::unhandled", victim = ?victim, "evicting pending unit under capacity pressure");
        Self::detach(maps, &victim);
        maps.unhandled.remove(&victim);
        maps.tips.remove(&victim);
    }
}

/// Take up to `limit` entries passing `keep`, starting at a random offset.
fn sample_from<H: Copy>(source: &[H], limit: usize, keep: impl Fn(&H) -> bool) -> Vec<H> {
    if source.is_empty() || limit == 0 {
        return Vec::new();
    }
    let offset = rand::thread_rng().gen_range(0..source.len());
    let mut out = Vec::new();
    for i in 0..source.len() {
        if out.len() >= limit {
            break;
        }
        let candidate = &source[(offset + i) % source.len()];
        if keep(candidate) {
            out.push(*candidate);
        }
    }
    out
}

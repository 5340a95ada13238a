//! Multi-Core Set-Associative Cache Simulator.
//!
//! This module implements the per-core cache used to detect false sharing.
//! Every simulated core owns one [`Cache`]; caches in the same coherence domain
//! know each other as peers. It models:
//! 1. **Residency:** Which lines occupy which ways, using a pluggable set strategy.
//! 2. **Classification:** Hit, Miss, or Tombstone for every access.
//! 3. **Coherence:** Stores invalidate the written range in every peer.
//! 4. **Interference:** Address pairs that collided on a tombstoned line.
//!
//! # Locking
//!
//! Each cache guards its sets, counters and peer list with its own mutex, held
//! for the whole of every public operation. A single [`WriteLock`] is shared by
//! all caches of a topology; every store takes it *before* its own mutex and
//! keeps it until the peer broadcast is done, so "update locally, then
//! invalidate peers" is atomic with respect to every other store. Peer
//! invalidation only takes the peer's own mutex and never fans out further,
//! so no cycle of waiting caches can form.

/// Address splitting and geometry validation.
pub mod geometry;
/// Interference tallies keyed by unordered address pairs.
pub mod interference;
/// The Miss/Tombstone/Hit lattice.
pub mod result;
/// Set strategies (direct-mapped, round-robin).
pub mod sets;
/// Line tag with tombstone tracking.
pub mod tag;

pub use geometry::Geometry;
pub use interference::{InterferenceCounts, InterferenceEntry, InterferenceKey};
pub use result::AccessResult;
pub use tag::LineTag;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, trace};

use self::sets::CacheSet;
use crate::common::{AccessKind, CacheType, ConfigError};
use crate::config::{BroadcastRange, CacheConfig, StoreAllocation};
use crate::stats::CacheStats;

/// Store-serialization lock shared by every cache of one topology.
///
/// Created once when the topology is built and handed to each cache by
/// [`Arc`]; it lives as long as the simulation run.
#[derive(Debug, Default)]
pub struct WriteLock {
    inner: Mutex<()>,
}

impl WriteLock {
    /// Creates an unlocked write lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a write lock ready to be shared between caches.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mutable state guarded by the per-cache mutex.
#[derive(Debug)]
struct CacheState {
    sets: Vec<Box<dyn CacheSet>>,
    stats: CacheStats,
    /// Peer caches. Never owned, never this cache itself.
    peers: Vec<Weak<Cache>>,
}

/// Line-aligned walk over `[addr, addr + size)`.
///
/// Always yields at least one address: the first is `addr` itself, every
/// following one is the start of the next line.
struct Segments {
    geometry: Geometry,
    next: Option<u64>,
    end: u64,
}

impl Segments {
    fn new(geometry: Geometry, addr: u64, size: u32) -> Self {
        Self {
            geometry,
            next: Some(addr),
            end: addr.saturating_add(u64::from(size)),
        }
    }
}

impl Iterator for Segments {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let cursor = self.next?;
        self.next = self
            .geometry
            .next_line(cursor)
            .filter(|&next| next < self.end);
        Some(cursor)
    }
}

/// Private cache of one simulated core.
///
/// Construct with [`Cache::new`], wrap in an [`Arc`], and wire peers with
/// [`Cache::register_peer`] before any traffic starts.
pub struct Cache {
    name: String,
    config: CacheConfig,
    geometry: Geometry,
    write_lock: Arc<WriteLock>,
    state: Mutex<CacheState>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("geometry", &self.geometry)
            .field("set_policy", &self.config.set_policy)
            .field("store_allocation", &self.config.store_allocation)
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Creates an empty cache.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in reports and log events.
    /// * `config` - Geometry, set strategy and policies.
    /// * `write_lock` - The store-serialization lock of the topology.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is not realisable. A
    /// cache with invalid geometry is never constructed.
    pub fn new(
        name: impl Into<String>,
        config: &CacheConfig,
        write_lock: Arc<WriteLock>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let geometry = config.geometry()?;

        let sets = (0..geometry.num_sets())
            .map(|_| sets::build(config.set_policy, config.ways, config.max_associativity))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            cache = %name,
            sets = geometry.num_sets(),
            ways = geometry.associativity(),
            line = geometry.line_size(),
            policy = ?config.set_policy,
            "cache created"
        );

        Ok(Self {
            name,
            config: config.clone(),
            geometry,
            write_lock,
            state: Mutex::new(CacheState {
                sets,
                stats: CacheStats::new(),
                peers: Vec::new(),
            }),
        })
    }

    /// Cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Addressing parameters.
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Configuration the cache was built from.
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Set and counter updates never leave the state half-written across a
        // panic point, so a poisoned mutex still guards consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocates(&self, kind: AccessKind) -> bool {
        match kind {
            AccessKind::Load => true,
            AccessKind::Store => self.config.store_allocation == StoreAllocation::Allocate,
            AccessKind::Invalidate => false,
        }
    }

    /// Accesses `[addr, addr + size)`.
    ///
    /// The range is split into line-aligned segments; each segment is looked
    /// up in its set and the per-line results are combined keeping the
    /// weakest. A segment that did not hit is allocated for loads, and for
    /// stores when the cache allocates on store misses. A store then
    /// invalidates the range in every peer while still holding the topology's
    /// write lock. Accesses of kind [`AccessKind::Invalidate`] are handled as
    /// [`Cache::invalidate`].
    ///
    /// # Returns
    ///
    /// `true` if every touched line was a clean hit.
    pub fn access(&self, addr: u64, size: u32, kind: AccessKind) -> bool {
        if kind == AccessKind::Invalidate {
            return self.invalidate(addr, size).is_hit();
        }

        let _serialized = (kind == AccessKind::Store).then(|| self.write_lock.acquire());
        let mut state = self.lock();
        let allocate = self.allocates(kind);

        let mut combined = AccessResult::Hit;
        let mut last = addr;
        for cursor in Segments::new(self.geometry, addr, size) {
            let (tag, set_index) = self.geometry.split(cursor);
            let tag = LineTag::new(tag);
            let set = &mut state.sets[set_index];

            let local = set.find(tag, cursor);
            combined = combined.combine(local);
            if !local.is_hit() && allocate {
                set.replace(tag);
            }
            last = cursor;
        }

        state.stats.record(kind, combined);

        if kind == AccessKind::Store {
            let start = match self.config.broadcast_range {
                BroadcastRange::Requested => addr,
                BroadcastRange::AfterSegmentation => {
                    self.geometry.next_line(last).unwrap_or(last)
                }
            };
            for peer in state.peers.iter().filter_map(Weak::upgrade) {
                trace!(from = %self.name, to = %peer.name, addr = start, size, "broadcast invalidate");
                let _ = peer.invalidate(start, size);
            }
        }

        combined.is_hit()
    }

    /// Accesses the single line containing `addr`.
    ///
    /// Same contract as [`Cache::access`] restricted to one line; a store
    /// invalidates only that line in every peer.
    pub fn access_single_line(&self, addr: u64, kind: AccessKind) -> bool {
        if kind == AccessKind::Invalidate {
            return self.invalidate_single_line(addr).is_hit();
        }

        let _serialized = (kind == AccessKind::Store).then(|| self.write_lock.acquire());
        let mut state = self.lock();

        let (tag, set_index) = self.geometry.split(addr);
        let tag = LineTag::new(tag);
        let set = &mut state.sets[set_index];

        let result = set.find(tag, addr);
        if !result.is_hit() && self.allocates(kind) {
            set.replace(tag);
        }

        state.stats.record(kind, result);

        if kind == AccessKind::Store {
            for peer in state.peers.iter().filter_map(Weak::upgrade) {
                trace!(from = %self.name, to = %peer.name, addr, "broadcast invalidate line");
                let _ = peer.invalidate_single_line(addr);
            }
        }

        result.is_hit()
    }

    /// Invalidates every line of `[addr, addr + size)`.
    ///
    /// Lines that currently hit are tombstoned with the address of their
    /// segment. The combined lookup result is counted under
    /// [`AccessKind::Invalidate`] whether or not anything was resident.
    pub fn invalidate(&self, addr: u64, size: u32) -> AccessResult {
        let mut state = self.lock();

        let mut combined = AccessResult::Hit;
        for cursor in Segments::new(self.geometry, addr, size) {
            let (tag, set_index) = self.geometry.split(cursor);
            let tag = LineTag::new(tag);
            let set = &mut state.sets[set_index];

            let local = set.find(tag, cursor);
            combined = combined.combine(local);
            if local.is_hit() {
                set.invalidate(tag, cursor);
            }
        }

        state.stats.record(AccessKind::Invalidate, combined);
        combined
    }

    /// Invalidates the line containing `addr`.
    pub fn invalidate_single_line(&self, addr: u64) -> AccessResult {
        let mut state = self.lock();

        let (tag, set_index) = self.geometry.split(addr);
        let tag = LineTag::new(tag);
        let set = &mut state.sets[set_index];

        let result = set.find(tag, addr);
        if result.is_hit() {
            set.invalidate(tag, addr);
        }

        state.stats.record(AccessKind::Invalidate, result);
        result
    }

    /// Registers one peer cache.
    ///
    /// The peer is referenced, not owned: dropping it elsewhere silently
    /// removes it from future broadcasts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SelfPeer`] if `peer` is this cache.
    pub fn register_peer(&self, peer: &Arc<Self>) -> Result<(), ConfigError> {
        self.register_peers(std::slice::from_ref(peer))
    }

    /// Registers several peer caches at once.
    ///
    /// Nothing is registered if any of them is this cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SelfPeer`] if `peers` contains this cache.
    pub fn register_peers(&self, peers: &[Arc<Self>]) -> Result<(), ConfigError> {
        if peers.iter().any(|peer| std::ptr::eq(self, Arc::as_ptr(peer))) {
            return Err(ConfigError::SelfPeer(self.name.clone()));
        }

        let mut state = self.lock();
        for peer in peers {
            debug!(cache = %self.name, peer = %peer.name, "peer registered");
            state.peers.push(Arc::downgrade(peer));
        }
        Ok(())
    }

    /// Number of registered peers still alive.
    pub fn peer_count(&self) -> usize {
        self.lock()
            .peers
            .iter()
            .filter(|peer| peer.strong_count() > 0)
            .count()
    }

    /// Interference observed by every set of this cache, summed key by key.
    ///
    /// Meant to be read once traffic has stopped.
    pub fn interference_counts(&self) -> InterferenceCounts {
        let state = self.lock();
        let mut counts = InterferenceCounts::new();
        for set_counts in state.sets.iter().filter_map(|set| set.interference_counts()) {
            counts.merge_from(set_counts);
        }
        counts
    }

    /// Snapshot of the classification counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    /// Text report of the classification counters.
    pub fn report(&self, prefix: &str, cache_type: CacheType) -> String {
        self.stats().report(&self.name, prefix, cache_type)
    }

    /// Looks `addr` up without touching counters or interference tallies.
    ///
    /// Returns the alive copy of the line if there is one, otherwise a
    /// tombstoned copy, otherwise `None`.
    pub fn probe(&self, addr: u64) -> Option<LineTag> {
        let (tag, set_index) = self.geometry.split(addr);
        self.lock().sets[set_index].lookup(LineTag::new(tag))
    }
}

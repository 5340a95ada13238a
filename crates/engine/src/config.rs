//! Configuration system for the cache simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! a simulated topology. It provides:
//! 1. **Defaults:** Baseline cache geometry and capacity bounds.
//! 2. **Structures:** Per-cache configuration and the root simulation configuration.
//! 3. **Enums:** Set strategy, store-allocation policy, and broadcast-range selection.
//!
//! Configuration is read from JSON by the CLI, or built with `SimConfig::default()`.

use serde::{Deserialize, Serialize};

use crate::cache::Geometry;
use crate::common::ConfigError;

/// Default configuration constants for the simulator.
///
/// These values define the baseline cache when not explicitly overridden in
/// a JSON configuration file.
pub mod defaults {
    /// Default number of simulated cores.
    pub const CORES: usize = 4;

    /// Default cache size in bytes (16 KiB).
    pub const CACHE_SIZE: usize = 16 * 1024;

    /// Default cache line size in bytes (64 bytes).
    pub const CACHE_LINE: usize = 64;

    /// Default cache associativity (4-way).
    pub const CACHE_WAYS: usize = 4;

    /// Fixed set capacity of a cache.
    ///
    /// Geometries deriving more sets than this are rejected at construction.
    pub const MAX_SETS: usize = 1024;

    /// Way capacity of a round-robin set.
    pub const MAX_ASSOCIATIVITY: usize = 16;
}

/// Set replacement strategy.
///
/// Selects which [`CacheSet`](crate::cache::sets::CacheSet) implementation
/// backs every set of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SetPolicy {
    /// One way per set; invalidation is a no-op and tombstones never occur.
    #[serde(alias = "DIRECT_MAPPED", alias = "direct_mapped")]
    DirectMapped,
    /// N ways per set with cyclic victim selection and tombstone tracking.
    #[default]
    #[serde(alias = "ROUND_ROBIN", alias = "round_robin")]
    RoundRobin,
}

/// Whether a store that misses pulls the line into the cache.
///
/// Loads always allocate on a miss or tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StoreAllocation {
    /// Stores allocate on a non-hit.
    #[default]
    #[serde(alias = "STORE_ALLOCATE")]
    Allocate,
    /// Stores bypass the cache on a non-hit.
    #[serde(alias = "STORE_NO_ALLOCATE")]
    NoAllocate,
}

/// Address range broadcast to peers after a multi-line store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BroadcastRange {
    /// Invalidate exactly the range the store requested, `[addr, addr + size)`.
    #[default]
    Requested,
    /// Invalidate `[end, end + size)`, where `end` is the line cursor left
    /// behind once segmentation has walked past the requested range.
    AfterSegmentation,
}

/// Configuration of a single simulated cache.
///
/// # Examples
///
/// ```
/// use fshare_core::config::{CacheConfig, SetPolicy, StoreAllocation};
///
/// let json = r#"{
///     "size_bytes": 32768,
///     "line_bytes": 64,
///     "ways": 8,
///     "set_policy": "RoundRobin",
///     "store_allocation": "NoAllocate"
/// }"#;
///
/// let config: CacheConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.ways, 8);
/// assert_eq!(config.set_policy, SetPolicy::RoundRobin);
/// assert_eq!(config.store_allocation, StoreAllocation::NoAllocate);
/// assert_eq!(config.geometry().unwrap().num_sets(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Total cache size in bytes
    #[serde(default = "CacheConfig::default_size")]
    pub size_bytes: usize,

    /// Cache line size in bytes
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: usize,

    /// Associativity (number of ways)
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: usize,

    /// Set replacement strategy
    #[serde(default)]
    pub set_policy: SetPolicy,

    /// Store allocation policy
    #[serde(default)]
    pub store_allocation: StoreAllocation,

    /// Range invalidated in peers after a multi-line store
    #[serde(default)]
    pub broadcast_range: BroadcastRange,

    /// Fixed set capacity
    #[serde(default = "CacheConfig::default_max_sets")]
    pub max_sets: usize,

    /// Way capacity of round-robin sets
    #[serde(default = "CacheConfig::default_max_associativity")]
    pub max_associativity: usize,
}

impl CacheConfig {
    /// Returns the default cache size in bytes.
    fn default_size() -> usize {
        defaults::CACHE_SIZE
    }

    /// Returns the default cache line size in bytes.
    fn default_line() -> usize {
        defaults::CACHE_LINE
    }

    /// Returns the default cache associativity (number of ways).
    fn default_ways() -> usize {
        defaults::CACHE_WAYS
    }

    fn default_max_sets() -> usize {
        defaults::MAX_SETS
    }

    fn default_max_associativity() -> usize {
        defaults::MAX_ASSOCIATIVITY
    }

    /// Direct-mapped configuration of the given size and line size.
    pub fn direct_mapped(size_bytes: usize, line_bytes: usize) -> Self {
        Self {
            size_bytes,
            line_bytes,
            ways: 1,
            set_policy: SetPolicy::DirectMapped,
            ..Self::default()
        }
    }

    /// Round-robin configuration of the given size, line size and associativity.
    pub fn round_robin(size_bytes: usize, line_bytes: usize, ways: usize) -> Self {
        Self {
            size_bytes,
            line_bytes,
            ways,
            set_policy: SetPolicy::RoundRobin,
            ..Self::default()
        }
    }

    /// Returns a copy with the given store-allocation policy.
    #[must_use]
    pub const fn with_store_allocation(mut self, store_allocation: StoreAllocation) -> Self {
        self.store_allocation = store_allocation;
        self
    }

    /// Returns a copy with the given broadcast-range behaviour.
    #[must_use]
    pub const fn with_broadcast_range(mut self, broadcast_range: BroadcastRange) -> Self {
        self.broadcast_range = broadcast_range;
        self
    }

    /// Validates the configuration and derives the cache geometry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the geometry is not realisable, the set
    /// count exceeds `max_sets`, or the associativity does not fit the chosen
    /// set strategy.
    pub fn geometry(&self) -> Result<Geometry, ConfigError> {
        let geometry = Geometry::new(self.size_bytes, self.line_bytes, self.ways)?;

        if geometry.num_sets() > self.max_sets {
            return Err(ConfigError::TooManySets {
                sets: geometry.num_sets(),
                max: self.max_sets,
            });
        }

        match self.set_policy {
            SetPolicy::DirectMapped if self.ways != 1 => {
                Err(ConfigError::DirectMappedWays(self.ways))
            }
            SetPolicy::RoundRobin if self.ways > self.max_associativity => {
                Err(ConfigError::AssociativityTooLarge {
                    ways: self.ways,
                    max: self.max_associativity,
                })
            }
            _ => Ok(geometry),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_bytes: defaults::CACHE_SIZE,
            line_bytes: defaults::CACHE_LINE,
            ways: defaults::CACHE_WAYS,
            set_policy: SetPolicy::default(),
            store_allocation: StoreAllocation::default(),
            broadcast_range: BroadcastRange::default(),
            max_sets: defaults::MAX_SETS,
            max_associativity: defaults::MAX_ASSOCIATIVITY,
        }
    }
}

/// Root configuration of a simulated topology.
///
/// Every core gets a private cache built from the same [`CacheConfig`].
///
/// ```
/// use fshare_core::config::SimConfig;
///
/// let config: SimConfig = serde_json::from_str(r#"{ "cores": 2 }"#).unwrap();
/// assert_eq!(config.cores, 2);
/// assert_eq!(config.cache.size_bytes, 16 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of simulated cores
    #[serde(default = "SimConfig::default_cores")]
    pub cores: usize,

    /// Per-core cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl SimConfig {
    fn default_cores() -> usize {
        defaults::CORES
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cores: defaults::CORES,
            cache: CacheConfig::default(),
        }
    }
}

//! Multi-core cache simulator for false-sharing detection.
//!
//! This crate simulates a private set-associative cache per core and detects
//! cases where cores write to different addresses that alias onto the same
//! cache line. It provides:
//! 1. **Cache:** Line tags with tombstones, set strategies, and the per-core cache with peer invalidation.
//! 2. **Statistics:** Hit/Miss/Tombstone counters per access kind and text reports.
//! 3. **Interference:** Colliding address pairs, and conflict records for layout repair.
//! 4. **Simulation:** Configuration, trace loading, and multi-threaded replay.

/// Per-core caches, set strategies, geometry, and interference tallies.
pub mod cache;
/// Common types (access kinds, errors).
pub mod common;
/// Simulator configuration (defaults, enums, cache and topology config).
pub mod config;
/// Conflict records consumed by layout repair.
pub mod conflict;
/// Trace loading and topology replay.
pub mod sim;
/// Cache statistics collection and reporting.
pub mod stats;

/// Per-core cache; share with `Arc` and wire peers before traffic.
pub use crate::cache::{AccessResult, Cache, InterferenceCounts, WriteLock};
/// Access classification used by every entry point.
pub use crate::common::{AccessKind, CacheType, ConfigError};
/// Cache configuration; use `CacheConfig::default()` or deserialize from JSON.
pub use crate::config::{CacheConfig, SimConfig};
/// A fully wired set of per-core caches.
pub use crate::sim::Topology;

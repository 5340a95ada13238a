//! Error definitions.
//!
//! This module defines the two failure families of the engine:
//! 1. **Configuration Errors:** Invalid cache geometry or topology wiring. These are
//!    unrecoverable for the cache being built; every access on a valid cache is infallible.
//! 2. **Trace Errors:** Malformed input while replaying a recorded access trace.

use thiserror::Error;

/// Invalid cache configuration or topology wiring.
///
/// Returned by [`Cache::new`](crate::cache::Cache::new),
/// [`Geometry::new`](crate::cache::Geometry::new) and peer registration. Any
/// derived addressing arithmetic would be silently wrong for these inputs, so
/// the cache is never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Total size or line size was zero.
    #[error("cache size and line size must be non-zero (size {size_bytes}, line {line_bytes})")]
    ZeroSize {
        /// Requested total size in bytes.
        size_bytes: usize,
        /// Requested line size in bytes.
        line_bytes: usize,
    },

    /// Line size is not a power of two.
    #[error("line size {0} is not a power of two")]
    LineSizeNotPowerOfTwo(usize),

    /// Associativity of zero was requested.
    #[error("associativity must be at least 1")]
    ZeroAssociativity,

    /// Total size is not a whole number of `line * ways` blocks.
    #[error("cache size {size_bytes} is not a multiple of line size {line_bytes} x {ways} ways")]
    UnevenGeometry {
        /// Requested total size in bytes.
        size_bytes: usize,
        /// Requested line size in bytes.
        line_bytes: usize,
        /// Requested associativity.
        ways: usize,
    },

    /// The derived set count is not a power of two.
    #[error("derived set count {0} is not a power of two")]
    SetCountNotPowerOfTwo(usize),

    /// The derived set count exceeds the cache's fixed set capacity.
    #[error("derived set count {sets} exceeds the maximum of {max}")]
    TooManySets {
        /// Derived number of sets.
        sets: usize,
        /// Configured set capacity.
        max: usize,
    },

    /// The requested associativity exceeds the set strategy's way capacity.
    #[error("associativity {ways} exceeds the maximum of {max}")]
    AssociativityTooLarge {
        /// Requested associativity.
        ways: usize,
        /// Way capacity of the set strategy.
        max: usize,
    },

    /// A direct-mapped set was asked for more than one way.
    #[error("direct-mapped sets have exactly one way, {0} requested")]
    DirectMappedWays(usize),

    /// A cache was registered as its own peer.
    #[error("cache `{0}` cannot be registered as its own peer")]
    SelfPeer(String),

    /// A topology needs at least one core.
    #[error("a topology needs at least one core")]
    NoCores,
}

/// Failure while reading or parsing a recorded access trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Underlying I/O failure.
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be parsed.
    #[error("line {line}: {reason}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// An operation names a core outside the topology.
    #[error("line {line}: core {core} is outside the topology of {cores} cores")]
    UnknownCore {
        /// One-based line number.
        line: usize,
        /// Core named by the operation.
        core: usize,
        /// Number of cores in the topology.
        cores: usize,
    },
}

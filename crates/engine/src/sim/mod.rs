//! Trace replay over a multi-core topology.
//!
//! Stands in for the instrumentation layer: loads recorded memory operations
//! and delivers them to the per-core caches.

/// Multi-core topology construction and replay.
pub mod topology;
/// Access trace parsing.
pub mod trace;

pub use topology::{CacheSummary, ReplaySummary, Summary, Topology};
pub use trace::{TraceOp, load_trace, read_trace};

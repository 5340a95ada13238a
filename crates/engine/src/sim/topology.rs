//! Multi-core topology: one cache per core, wired as a coherence domain.
//!
//! The topology plays the role of the instrumentation layer. It builds every
//! cache with the same validated configuration and one shared [`WriteLock`],
//! registers each cache with every other one (never with itself), and replays
//! recorded operations with one thread per core.

use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::{debug, info};

use super::trace::TraceOp;
use crate::cache::{Cache, InterferenceCounts, WriteLock};
use crate::common::{AccessKind, CacheType, ConfigError, TraceError};
use crate::config::{CacheConfig, SimConfig};
use crate::stats::CacheStats;

/// Outcome of replaying a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Operations replayed.
    pub operations: usize,
    /// Operations whose every line was a clean hit.
    pub hits: usize,
}

/// Per-cache section of a [`Summary`].
#[derive(Clone, Debug, Serialize)]
pub struct CacheSummary {
    /// Cache name.
    pub name: String,
    /// Classification counters.
    pub stats: CacheStats,
    /// Interference observed by this cache.
    pub interference: InterferenceCounts,
}

/// Machine-readable results of a run.
#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    /// One entry per core.
    pub caches: Vec<CacheSummary>,
    /// Interference merged across all caches.
    pub interference: InterferenceCounts,
}

/// The caches of every simulated core.
#[derive(Debug)]
pub struct Topology {
    caches: Vec<Arc<Cache>>,
    write_lock: Arc<WriteLock>,
}

impl Topology {
    /// Builds `cores` caches named `core0`, `core1`, ... and registers each as
    /// a peer of all the others.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoCores`] for an empty topology, or the
    /// configuration error of the cache geometry.
    pub fn new(cores: usize, config: &CacheConfig) -> Result<Self, ConfigError> {
        if cores == 0 {
            return Err(ConfigError::NoCores);
        }

        let write_lock = WriteLock::shared();
        let caches = (0..cores)
            .map(|core| {
                Cache::new(format!("core{core}"), config, Arc::clone(&write_lock)).map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (index, cache) in caches.iter().enumerate() {
            let peers: Vec<_> = caches
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != index)
                .map(|(_, peer)| Arc::clone(peer))
                .collect();
            cache.register_peers(&peers)?;
        }

        debug!(cores, "topology wired");
        Ok(Self { caches, write_lock })
    }

    /// Builds the topology described by a root configuration.
    ///
    /// # Errors
    ///
    /// See [`Topology::new`].
    pub fn from_config(config: &SimConfig) -> Result<Self, ConfigError> {
        Self::new(config.cores, &config.cache)
    }

    /// Number of cores.
    pub fn cores(&self) -> usize {
        self.caches.len()
    }

    /// Cache of `core`.
    pub fn cache(&self, core: usize) -> Option<&Arc<Cache>> {
        self.caches.get(core)
    }

    /// All caches, indexed by core.
    pub fn caches(&self) -> &[Arc<Cache>] {
        &self.caches
    }

    /// The store-serialization lock shared by every cache.
    pub const fn write_lock(&self) -> &Arc<WriteLock> {
        &self.write_lock
    }

    /// Delivers one operation to its core's cache.
    ///
    /// Operations naming a core outside the topology are ignored and return
    /// `false`; [`Topology::run`] rejects them up front.
    pub fn apply(&self, op: &TraceOp) -> bool {
        let Some(cache) = self.caches.get(op.core) else {
            return false;
        };
        match (op.kind, op.size) {
            (AccessKind::Invalidate, Some(size)) => cache.invalidate(op.addr, size).is_hit(),
            (AccessKind::Invalidate, None) => cache.invalidate_single_line(op.addr).is_hit(),
            (kind, Some(size)) => cache.access(op.addr, size, kind),
            (kind, None) => cache.access_single_line(op.addr, kind),
        }
    }

    /// Replays `ops`, one thread per core.
    ///
    /// Each core sees its own operations in trace order; operations of
    /// different cores interleave freely, the way the instrumented program's
    /// threads did.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::UnknownCore`] before replaying anything if an
    /// operation names a core outside the topology.
    pub fn run(&self, ops: &[TraceOp]) -> Result<ReplaySummary, TraceError> {
        let cores = self.cores();
        if let Some(op) = ops.iter().find(|op| op.core >= cores) {
            return Err(TraceError::UnknownCore {
                line: op.line,
                core: op.core,
                cores,
            });
        }

        let mut per_core: Vec<Vec<&TraceOp>> = vec![Vec::new(); cores];
        for op in ops {
            per_core[op.core].push(op);
        }

        let hits: usize = thread::scope(|scope| {
            let workers: Vec<_> = per_core
                .iter()
                .map(|core_ops| {
                    scope.spawn(move || core_ops.iter().filter(|op| self.apply(op)).count())
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .sum()
        });

        info!(operations = ops.len(), hits, "trace replayed");
        Ok(ReplaySummary {
            operations: ops.len(),
            hits,
        })
    }

    /// Interference observed by every cache, summed key by key.
    pub fn interference_counts(&self) -> InterferenceCounts {
        let mut counts = InterferenceCounts::new();
        for cache in &self.caches {
            counts.merge_from(&cache.interference_counts());
        }
        counts
    }

    /// Counters of every cache, summed.
    pub fn total_stats(&self) -> CacheStats {
        let mut total = CacheStats::new();
        for cache in &self.caches {
            total.merge_from(&cache.stats());
        }
        total
    }

    /// Concatenated text reports of every cache.
    pub fn report(&self, cache_type: CacheType) -> String {
        self.caches
            .iter()
            .map(|cache| cache.report("", cache_type))
            .collect()
    }

    /// Machine-readable results.
    pub fn summary(&self) -> Summary {
        Summary {
            caches: self
                .caches
                .iter()
                .map(|cache| CacheSummary {
                    name: cache.name().to_owned(),
                    stats: cache.stats(),
                    interference: cache.interference_counts(),
                })
                .collect(),
            interference: self.interference_counts(),
        }
    }

    /// [`Topology::summary`] as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialization failure.
    pub fn summary_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }
}

//! Memory Access Kinds.
//!
//! This module defines the classification of memory operations delivered to a
//! simulated cache. These kinds are used for the following:
//! 1. **Allocation Decisions:** Loads always allocate on a non-hit; stores follow the store-allocation policy.
//! 2. **Coherence:** Stores broadcast invalidations to every peer cache.
//! 3. **Statistics Tracking:** Counters are kept per kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of memory operation observed on a simulated core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessKind {
    /// Data read.
    ///
    /// Always allocates the line on a miss or tombstone.
    Load,

    /// Data write.
    ///
    /// Allocation on a non-hit is governed by
    /// [`StoreAllocation`](crate::config::StoreAllocation). Every store is
    /// serialized against all other stores in the topology and invalidates the
    /// written range in every peer cache.
    Store,

    /// Coherence invalidation arriving from a peer (or requested explicitly).
    Invalidate,
}

impl AccessKind {
    /// Number of access kinds tracked by the statistics tables.
    pub const COUNT: usize = 3;

    /// All kinds, in report order.
    pub const ALL: [Self; Self::COUNT] = [Self::Load, Self::Store, Self::Invalidate];

    /// Row of this kind in the statistics table.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Load => 0,
            Self::Store => 1,
            Self::Invalidate => 2,
        }
    }

    /// Label used in textual reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Load => "Load",
            Self::Store => "Store",
            Self::Invalidate => "Invalidate",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AccessKind {
    type Err = String;

    /// Accepts the single-letter trace mnemonics (`L`, `S`, `I`) as well as
    /// the full names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l" | "r" | "load" | "read" => Ok(Self::Load),
            "s" | "w" | "store" | "write" => Ok(Self::Store),
            "i" | "inv" | "invalidate" => Ok(Self::Invalidate),
            other => Err(format!("unknown access kind `{other}`")),
        }
    }
}

/// Kind of cache being reported on.
///
/// Instruction caches never see stores or invalidations, so their reports
/// only carry the totals block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheType {
    /// Instruction cache.
    Instruction,
    /// Data cache.
    #[default]
    Data,
}

//! Cache statistics collection and reporting.
//!
//! This module tracks per-cache classification counters. It provides:
//! 1. **Counters:** Miss/Tombstone/Hit counts for each access kind (Load, Store, Invalidate).
//! 2. **Derived metrics:** Per-kind and total hits, misses, tombstones and accesses.
//! 3. **Reporting:** A fixed-width text report with raw counts and percentages.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::cache::AccessResult;
use crate::common::{AccessKind, CacheType};

/// Width of the label column in text reports.
const HEADER_WIDTH: usize = 19;
/// Width of the count column in text reports.
const NUMBER_WIDTH: usize = 12;

/// Classification counters of one cache.
///
/// `counts[kind][result]` where rows follow [`AccessKind::index`] and columns
/// follow [`AccessResult::index`]. For every kind, and for the totals,
/// `accesses == hits + misses + tombstones`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    counts: [[u64; AccessResult::COUNT]; AccessKind::COUNT],
}

impl CacheStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one classified access.
    #[inline]
    pub const fn record(&mut self, kind: AccessKind, result: AccessResult) {
        self.counts[kind.index()][result.index()] += 1;
    }

    /// Raw counter for one kind and result.
    #[inline]
    pub const fn count(&self, kind: AccessKind, result: AccessResult) -> u64 {
        self.counts[kind.index()][result.index()]
    }

    /// Clean hits of `kind`.
    pub const fn hits(&self, kind: AccessKind) -> u64 {
        self.count(kind, AccessResult::Hit)
    }

    /// Misses of `kind`.
    pub const fn misses(&self, kind: AccessKind) -> u64 {
        self.count(kind, AccessResult::Miss)
    }

    /// Tombstone (interference) results of `kind`.
    pub const fn tombstones(&self, kind: AccessKind) -> u64 {
        self.count(kind, AccessResult::Tombstone)
    }

    /// All accesses of `kind`.
    pub const fn accesses(&self, kind: AccessKind) -> u64 {
        self.hits(kind) + self.misses(kind) + self.tombstones(kind)
    }

    fn sum(&self, result: AccessResult) -> u64 {
        AccessKind::ALL
            .iter()
            .map(|&kind| self.count(kind, result))
            .sum()
    }

    /// Clean hits across all kinds.
    pub fn total_hits(&self) -> u64 {
        self.sum(AccessResult::Hit)
    }

    /// Misses across all kinds.
    pub fn total_misses(&self) -> u64 {
        self.sum(AccessResult::Miss)
    }

    /// Tombstones across all kinds.
    pub fn total_tombstones(&self) -> u64 {
        self.sum(AccessResult::Tombstone)
    }

    /// Accesses across all kinds.
    pub fn total_accesses(&self) -> u64 {
        self.total_hits() + self.total_misses() + self.total_tombstones()
    }

    /// Adds every counter of `other` into these counters.
    pub fn merge_from(&mut self, other: &Self) {
        for (row, other_row) in self.counts.iter_mut().zip(&other.counts) {
            for (count, other_count) in row.iter_mut().zip(other_row) {
                *count += other_count;
            }
        }
    }

    /// Renders the text report.
    ///
    /// Every line starts with `prefix`. Data caches get one block per access
    /// kind followed by the totals block; instruction caches only get the
    /// totals. Percentages of a kind with no accesses are reported as 0%.
    ///
    /// # Arguments
    ///
    /// * `name` - Cache name printed in the header line.
    /// * `prefix` - String prepended to every line.
    /// * `cache_type` - Selects which blocks are rendered.
    pub fn report(&self, name: &str, prefix: &str, cache_type: CacheType) -> String {
        let mut out = format!("{prefix}{name}:\n");

        if cache_type != CacheType::Instruction {
            for kind in AccessKind::ALL {
                let total = self.accesses(kind);
                let label = kind.label();
                push_line(&mut out, prefix, &format!("{label}-Hits:"), self.hits(kind), total);
                push_line(&mut out, prefix, &format!("{label}-Misses:"), self.misses(kind), total);
                push_line(
                    &mut out,
                    prefix,
                    &format!("{label}-Tombstones:"),
                    self.tombstones(kind),
                    total,
                );
                push_line(&mut out, prefix, &format!("{label}-Accesses:"), total, total);
                out.push_str(prefix);
                out.push('\n');
            }
        }

        let total = self.total_accesses();
        push_line(&mut out, prefix, "Total-Hits:", self.total_hits(), total);
        push_line(&mut out, prefix, "Total-Misses:", self.total_misses(), total);
        push_line(&mut out, prefix, "Total-Tombstones:", self.total_tombstones(), total);
        push_line(&mut out, prefix, "Total-Accesses:", total, total);
        out.push('\n');

        out
    }
}

/// `part` as a percentage of `whole`; 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

fn push_line(out: &mut String, prefix: &str, label: &str, count: u64, total: u64) {
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "{prefix}{label:<HEADER_WIDTH$}{count:>NUMBER_WIDTH$}  {:>6.2}%",
        percentage(count, total)
    );
}

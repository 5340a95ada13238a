//! Interference (false-sharing) tallies.
//!
//! An interference record is produced when an access finds its line
//! tombstoned by a *different* address: both addresses alias onto one cache
//! line, and a store to one of them evicted the other from a peer. Pairs are
//! unordered, so which side touched the line first is not recoverable.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// Unordered pair of colliding addresses, normalised so `lower <= upper`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterferenceKey {
    /// Smaller of the two addresses.
    pub lower: u64,
    /// Larger of the two addresses.
    pub upper: u64,
}

impl InterferenceKey {
    /// Builds the key for two addresses in either order.
    #[inline]
    pub fn new(a: u64, b: u64) -> Self {
        Self {
            lower: a.min(b),
            upper: a.max(b),
        }
    }

    /// Byte distance between the two addresses.
    #[inline]
    pub const fn distance(&self) -> u64 {
        self.upper - self.lower
    }
}

/// Occurrence count per interfering address pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<InterferenceEntry>", from = "Vec<InterferenceEntry>")]
pub struct InterferenceCounts {
    counts: BTreeMap<InterferenceKey, u64>,
}

/// One flattened tally entry.
///
/// This is the serialized form of [`InterferenceCounts`]; JSON objects cannot
/// be keyed by a struct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterferenceEntry {
    /// Smaller of the two addresses.
    pub lower: u64,
    /// Larger of the two addresses.
    pub upper: u64,
    /// Number of collisions.
    pub count: u64,
}

impl InterferenceCounts {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one collision between `a` and `b`.
    pub fn record(&mut self, a: u64, b: u64) {
        *self.counts.entry(InterferenceKey::new(a, b)).or_insert(0) += 1;
    }

    /// Adds `count` collisions for `key`.
    pub fn add(&mut self, key: InterferenceKey, count: u64) {
        *self.counts.entry(key).or_insert(0) += count;
    }

    /// Number of collisions recorded between `a` and `b`, in either order.
    pub fn get(&self, a: u64, b: u64) -> u64 {
        self.counts
            .get(&InterferenceKey::new(a, b))
            .copied()
            .unwrap_or(0)
    }

    /// Sums every entry of `other` into this tally, key by key.
    pub fn merge_from(&mut self, other: &Self) {
        for (&key, &count) in &other.counts {
            self.add(key, count);
        }
    }

    /// Number of distinct address pairs.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` when no interference was observed.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all occurrence counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterates pairs in ascending address order.
    pub fn iter(&self) -> btree_map::Iter<'_, InterferenceKey, u64> {
        self.counts.iter()
    }

    /// Pairs sorted by descending count, ties broken by address.
    pub fn ranked(&self) -> Vec<(InterferenceKey, u64)> {
        let mut ranked: Vec<_> = self.counts.iter().map(|(&k, &c)| (k, c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

impl<'a> IntoIterator for &'a InterferenceCounts {
    type Item = (&'a InterferenceKey, &'a u64);
    type IntoIter = btree_map::Iter<'a, InterferenceKey, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

impl FromIterator<(InterferenceKey, u64)> for InterferenceCounts {
    fn from_iter<I: IntoIterator<Item = (InterferenceKey, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (key, count) in iter {
            counts.add(key, count);
        }
        counts
    }
}

impl From<InterferenceCounts> for Vec<InterferenceEntry> {
    fn from(counts: InterferenceCounts) -> Self {
        counts
            .counts
            .into_iter()
            .map(|(key, count)| InterferenceEntry {
                lower: key.lower,
                upper: key.upper,
                count,
            })
            .collect()
    }
}

impl From<Vec<InterferenceEntry>> for InterferenceCounts {
    fn from(entries: Vec<InterferenceEntry>) -> Self {
        entries
            .into_iter()
            .map(|e| (InterferenceKey::new(e.lower, e.upper), e.count))
            .collect()
    }
}

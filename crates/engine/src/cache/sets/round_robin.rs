//! Round-Robin Set with Tombstones.
//!
//! This set evicts ways in a fixed cyclic order, regardless of how recently
//! they were accessed. Two cursors walk the ways downwards and wrap from way 0
//! back to the last way:
//!
//! - the *victim* cursor names the way the next replacement overwrites;
//! - the *tombstone* cursor names the slot invalidated lines are moved to, so
//!   dead lines queue up ahead of live ones at the eviction point.
//!
//! An invalidated line stays resident as a tombstone that remembers the
//! address whose store killed it. A later access to a *different* address in
//! the same line is counted as interference (false sharing) between the two
//! addresses.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `find()`: O(W)
//!   - `replace()`: O(1)
//!   - `invalidate()`: O(W) per invalidated copy
//! - **Space Complexity:** O(W) plus one map entry per distinct interfering pair

use tracing::trace;

use super::CacheSet;
use crate::cache::interference::InterferenceCounts;
use crate::cache::result::AccessResult;
use crate::cache::tag::LineTag;
use crate::common::ConfigError;

/// Round-robin set state.
#[derive(Debug)]
pub struct RoundRobin {
    /// Way slots; `None` marks a way that has never been filled.
    ways: Vec<Option<LineTag>>,
    /// Way capacity fixed at construction.
    capacity: usize,
    /// Next way to overwrite on replacement.
    next_replace: usize,
    /// Next slot an invalidated line is moved into.
    next_tombstone: usize,
    /// Collisions observed between tombstones and aliasing addresses.
    interference: InterferenceCounts,
}

impl RoundRobin {
    /// Creates a set able to hold up to `capacity` ways, configured with all
    /// of them.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ways: vec![None; capacity],
            capacity,
            next_replace: capacity - 1,
            next_tombstone: capacity - 1,
            interference: InterferenceCounts::new(),
        }
    }

    /// Way capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Contents of way `index`, `None` if empty or out of range.
    pub fn way(&self, index: usize) -> Option<LineTag> {
        self.ways.get(index).copied().flatten()
    }

    /// Way the next replacement will overwrite.
    pub const fn victim_cursor(&self) -> usize {
        self.next_replace
    }

    /// Slot the next invalidated line will be moved into.
    pub const fn tombstone_cursor(&self) -> usize {
        self.next_tombstone
    }

    /// Number of filled ways.
    pub fn resident(&self) -> usize {
        self.ways.iter().filter(|w| w.is_some()).count()
    }

    /// Cursor position following `index`.
    #[inline]
    fn step(&self, index: usize) -> usize {
        if index == 0 {
            self.ways.len() - 1
        } else {
            index - 1
        }
    }

    fn alive_way(&self, tag: LineTag) -> Option<usize> {
        self.ways
            .iter()
            .rposition(|way| matches!(way, Some(line) if *line == tag && !line.is_dead()))
    }
}

impl CacheSet for RoundRobin {
    /// Scans every way for `tag`.
    ///
    /// An alive copy is a hit and ends the scan. A tombstone left by `addr`
    /// itself is a miss. A tombstone left by any other address is
    /// interference: the pair is counted and the scan keeps going, since a
    /// live copy may still sit in another way. Without a hit, the set reports
    /// `Tombstone` if any interference was counted and `Miss` otherwise.
    fn find(&mut self, tag: LineTag, addr: u64) -> AccessResult {
        let mut result = AccessResult::Miss;

        for line in self.ways.iter().rev().flatten() {
            if *line != tag {
                continue;
            }
            match line.tombstone_address() {
                None => return AccessResult::Hit,
                Some(killer) if killer == addr => {}
                Some(killer) => {
                    trace!(
                        tag = tag.value(),
                        killer,
                        addr,
                        distance = killer.abs_diff(addr),
                        "interference"
                    );
                    self.interference.record(killer, addr);
                    result = AccessResult::Tombstone;
                }
            }
        }

        result
    }

    fn lookup(&self, tag: LineTag) -> Option<LineTag> {
        let mut copies = self.ways.iter().flatten().filter(|line| **line == tag);
        let first = copies.next().copied()?;
        if first.is_dead() {
            Some(copies.find(|line| !line.is_dead()).copied().unwrap_or(first))
        } else {
            Some(first)
        }
    }

    fn replace(&mut self, tag: LineTag) {
        let index = self.next_replace;

        self.ways[index] = Some(LineTag::new(tag.value()));
        if self.next_tombstone == index {
            self.next_tombstone = self.step(index);
        }
        self.next_replace = self.step(index);
    }

    fn invalidate(&mut self, tag: LineTag, addr: u64) {
        while let Some(index) = self.alive_way(tag) {
            if let Some(line) = self.ways[index].as_mut() {
                line.kill(addr);
            }
            self.ways.swap(index, self.next_tombstone);
            self.next_tombstone = self.step(self.next_tombstone);
        }
    }

    fn set_associativity(&mut self, ways: usize) -> Result<(), ConfigError> {
        if ways == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }
        if ways > self.capacity {
            return Err(ConfigError::AssociativityTooLarge {
                ways,
                max: self.capacity,
            });
        }

        self.ways.clear();
        self.ways.resize(ways, None);
        self.next_replace = ways - 1;
        self.next_tombstone = ways - 1;
        Ok(())
    }

    fn associativity(&self) -> usize {
        self.ways.len()
    }

    fn interference_counts(&self) -> Option<&InterferenceCounts> {
        Some(&self.interference)
    }
}

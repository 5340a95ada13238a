//! Cache Set Strategies.
//!
//! Implements lookup, replacement and invalidation for the ways of one cache set.
//!
//! # Strategies
//!
//! - `DirectMapped`: a single way; invalidation is a no-op.
//! - `RoundRobin`: N ways, cyclic victim selection, tombstone-aware.

/// Direct-mapped (one way) set.
pub mod direct_mapped;

/// Round-robin N-way set with tombstone tracking.
pub mod round_robin;

pub use direct_mapped::DirectMapped;
pub use round_robin::RoundRobin;

use std::fmt;

use super::interference::InterferenceCounts;
use super::result::AccessResult;
use super::tag::LineTag;
use crate::common::ConfigError;
use crate::config::SetPolicy;

/// Trait for the ways of one cache set.
///
/// A set owns a bounded collection of [`LineTag`] slots. The owning cache
/// locates the set from the address and delegates all slot manipulation here.
pub trait CacheSet: Send + fmt::Debug {
    /// Looks a tag up.
    ///
    /// # Arguments
    ///
    /// * `tag` - The line identity being accessed.
    /// * `addr` - The exact address being accessed, used to tell a re-access
    ///   of an invalidated address apart from an aliasing one.
    fn find(&mut self, tag: LineTag, addr: u64) -> AccessResult;

    /// Returns the alive copy of `tag` if resident, otherwise a tombstoned
    /// copy, otherwise `None`. Has no side effects.
    fn lookup(&self, tag: LineTag) -> Option<LineTag>;

    /// Installs `tag` as a fresh, alive line, evicting a victim if needed.
    fn replace(&mut self, tag: LineTag);

    /// Tombstones every alive way holding `tag`, recording `addr`.
    fn invalidate(&mut self, tag: LineTag, addr: u64);

    /// Resets the set to `ways` empty ways.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the strategy cannot hold `ways` ways.
    fn set_associativity(&mut self, ways: usize) -> Result<(), ConfigError>;

    /// Current number of ways.
    fn associativity(&self) -> usize;

    /// Interference observed by this set, if the strategy tracks it.
    fn interference_counts(&self) -> Option<&InterferenceCounts> {
        None
    }
}

/// Builds one empty set of the requested strategy.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `ways` does not fit the strategy.
pub fn build(
    policy: SetPolicy,
    ways: usize,
    max_associativity: usize,
) -> Result<Box<dyn CacheSet>, ConfigError> {
    let mut set: Box<dyn CacheSet> = match policy {
        SetPolicy::DirectMapped => Box::new(DirectMapped::new()),
        SetPolicy::RoundRobin => Box::new(RoundRobin::with_capacity(max_associativity)),
    };
    set.set_associativity(ways)?;
    Ok(set)
}

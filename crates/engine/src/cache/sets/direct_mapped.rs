//! Direct-Mapped Set.
//!
//! A set with exactly one way. A lookup hits when the resident tag equals the
//! queried tag. With a single way there is no way to tell "invalidated" from
//! "never present", so invalidation does nothing and a direct-mapped cache
//! never reports tombstones.

use super::CacheSet;
use crate::cache::result::AccessResult;
use crate::cache::tag::LineTag;
use crate::common::ConfigError;

/// Direct-mapped set state.
#[derive(Debug, Default)]
pub struct DirectMapped {
    /// Resident line, `None` until the first replacement.
    line: Option<LineTag>,
}

impl DirectMapped {
    /// Creates an empty direct-mapped set.
    pub const fn new() -> Self {
        Self { line: None }
    }

    /// The resident line, if any.
    pub const fn resident(&self) -> Option<LineTag> {
        self.line
    }
}

impl CacheSet for DirectMapped {
    fn find(&mut self, tag: LineTag, _addr: u64) -> AccessResult {
        if self.line == Some(tag) {
            AccessResult::Hit
        } else {
            AccessResult::Miss
        }
    }

    fn lookup(&self, tag: LineTag) -> Option<LineTag> {
        self.line.filter(|line| *line == tag)
    }

    fn replace(&mut self, tag: LineTag) {
        self.line = Some(LineTag::new(tag.value()));
    }

    fn invalidate(&mut self, _tag: LineTag, _addr: u64) {}

    fn set_associativity(&mut self, ways: usize) -> Result<(), ConfigError> {
        if ways != 1 {
            return Err(ConfigError::DirectMappedWays(ways));
        }
        self.line = None;
        Ok(())
    }

    fn associativity(&self) -> usize {
        1
    }
}

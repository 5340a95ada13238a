//! Cache geometry and address splitting.
//!
//! A geometry is derived once from (total size, line size, associativity) and
//! never changes. It provides the following:
//! 1. **Validation:** Line size and set count must be powers of two.
//! 2. **Address Splitting:** `tag = addr >> log2(line)`, `set = tag & (sets - 1)`.
//! 3. **Line Walking:** Line-aligned stepping used to segment multi-line accesses.

use crate::common::ConfigError;

/// Immutable addressing parameters of one cache.
///
/// Invariant: `num_sets * associativity * line_size == size_bytes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    size_bytes: usize,
    line_size: usize,
    associativity: usize,
    line_shift: u32,
    set_mask: u64,
}

impl Geometry {
    /// Derives and validates a geometry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a size is zero, the line size is not a
    /// power of two, the total size does not divide into whole sets, or the
    /// resulting set count is not a power of two.
    pub fn new(
        size_bytes: usize,
        line_size: usize,
        associativity: usize,
    ) -> Result<Self, ConfigError> {
        if size_bytes == 0 || line_size == 0 {
            return Err(ConfigError::ZeroSize {
                size_bytes,
                line_bytes: line_size,
            });
        }
        if !line_size.is_power_of_two() {
            return Err(ConfigError::LineSizeNotPowerOfTwo(line_size));
        }
        if associativity == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }

        let set_bytes = line_size.saturating_mul(associativity);
        if size_bytes % set_bytes != 0 {
            return Err(ConfigError::UnevenGeometry {
                size_bytes,
                line_bytes: line_size,
                ways: associativity,
            });
        }

        let num_sets = size_bytes / set_bytes;
        if !num_sets.is_power_of_two() {
            return Err(ConfigError::SetCountNotPowerOfTwo(num_sets));
        }

        Ok(Self {
            size_bytes,
            line_size,
            associativity,
            line_shift: line_size.trailing_zeros(),
            set_mask: (num_sets - 1) as u64,
        })
    }

    /// Total capacity in bytes.
    #[inline]
    pub const fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Line size in bytes.
    #[inline]
    pub const fn line_size(&self) -> usize {
        self.line_size
    }

    /// Number of ways per set.
    #[inline]
    pub const fn associativity(&self) -> usize {
        self.associativity
    }

    /// Number of sets.
    #[inline]
    pub const fn num_sets(&self) -> usize {
        self.set_mask as usize + 1
    }

    /// Width of the line-offset field in bits.
    #[inline]
    pub const fn line_shift(&self) -> u32 {
        self.line_shift
    }

    /// Mask applied to a tag to select its set.
    #[inline]
    pub const fn set_mask(&self) -> u64 {
        self.set_mask
    }

    /// Splits an address into `(tag, set_index)`.
    #[inline]
    pub const fn split(&self, addr: u64) -> (u64, usize) {
        let tag = addr >> self.line_shift;
        (tag, (tag & self.set_mask) as usize)
    }

    /// Splits an address into `(tag, set_index, line_offset)`.
    #[inline]
    pub const fn split_with_offset(&self, addr: u64) -> (u64, usize, u64) {
        let (tag, set) = self.split(addr);
        (tag, set, addr & (self.line_size as u64 - 1))
    }

    /// Start address of the line containing `addr`.
    #[inline]
    pub const fn line_base(&self, addr: u64) -> u64 {
        addr & !(self.line_size as u64 - 1)
    }

    /// Start address of the line following the one containing `addr`, or
    /// `None` at the top of the address space.
    #[inline]
    pub const fn next_line(&self, addr: u64) -> Option<u64> {
        self.line_base(addr).checked_add(self.line_size as u64)
    }
}

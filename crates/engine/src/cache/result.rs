//! Access classification lattice.

use serde::{Deserialize, Serialize};

/// Outcome of looking a line up in a set.
///
/// Results are totally ordered `Miss < Tombstone < Hit`. An access spanning
/// several lines is classified by the weakest of its per-line results, see
/// [`AccessResult::combine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessResult {
    /// The line is not resident, or is tombstoned by the same address.
    Miss,
    /// The line is tombstoned by a different address that aliases onto it.
    Tombstone,
    /// The line is resident and alive.
    Hit,
}

impl AccessResult {
    /// Number of distinct results tracked by the statistics tables.
    pub const COUNT: usize = 3;

    /// Combines two results, keeping the weaker one.
    ///
    /// ```
    /// use fshare_core::cache::AccessResult::{Hit, Miss, Tombstone};
    ///
    /// assert_eq!(Hit.combine(Tombstone), Tombstone);
    /// assert_eq!(Tombstone.combine(Miss), Miss);
    /// assert_eq!(Hit.combine(Hit), Hit);
    /// ```
    #[inline]
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        self.min(other)
    }

    /// Column of this result in the statistics table.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Miss => 0,
            Self::Tombstone => 1,
            Self::Hit => 2,
        }
    }

    /// Returns `true` for a clean hit.
    #[inline]
    pub const fn is_hit(self) -> bool {
        matches!(self, Self::Hit)
    }
}

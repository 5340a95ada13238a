//! Cache line tag with tombstone tracking.

/// Identity of one resident cache line plus its tombstone state.
///
/// The `tag` is the address shifted right by the line-offset width, so it
/// identifies a line independently of the set it lives in. A tag is either
/// alive or tombstoned; a tombstoned tag remembers the address whose
/// invalidation killed it. Tombstone state is orthogonal to identity: two
/// tags compare equal whenever their `tag` bits do.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineTag {
    tag: u64,
    tombstone: Option<u64>,
}

impl LineTag {
    /// Creates a fresh, alive tag.
    #[inline]
    pub const fn new(tag: u64) -> Self {
        Self {
            tag,
            tombstone: None,
        }
    }

    /// Returns the raw tag bits.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.tag
    }

    /// Tombstones the tag, recording the address that caused the invalidation.
    #[inline]
    pub const fn kill(&mut self, addr: u64) {
        self.tombstone = Some(addr);
    }

    /// Returns `true` if the tag has been tombstoned.
    #[inline]
    pub const fn is_dead(&self) -> bool {
        self.tombstone.is_some()
    }

    /// Returns `true` if the tag is tombstoned by exactly `addr`.
    #[inline]
    pub fn matches(&self, addr: u64) -> bool {
        self.tombstone == Some(addr)
    }

    /// Address recorded at invalidation, or `None` while alive.
    #[inline]
    pub const fn tombstone_address(&self) -> Option<u64> {
        self.tombstone
    }
}

impl PartialEq for LineTag {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for LineTag {}

impl From<u64> for LineTag {
    fn from(tag: u64) -> Self {
        Self::new(tag)
    }
}

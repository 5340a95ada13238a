//! Single-cache behaviour.
//!
//! Covers classification, allocation policies, multi-line segmentation and
//! the false-sharing walkthrough on a 16 KiB, 64-byte line, 4-way cache.

use fshare_core::cache::{AccessResult, Cache, WriteLock};
use fshare_core::common::AccessKind;
use fshare_core::config::{CacheConfig, StoreAllocation};
use pretty_assertions::assert_eq;

use crate::common::{four_way_config, init_tracing, no_allocate_config, standalone};

#[test]
fn repeated_load_hits() {
    let cache = standalone(&four_way_config());

    assert!(!cache.access(0x1000, 8, AccessKind::Load));
    assert!(cache.access(0x1000, 8, AccessKind::Load));
    assert!(cache.access(0x1038, 8, AccessKind::Load));

    let stats = cache.stats();
    assert_eq!(stats.misses(AccessKind::Load), 1);
    assert_eq!(stats.hits(AccessKind::Load), 2);
}

#[test]
fn access_spanning_two_lines_touches_both() {
    let cache = standalone(&four_way_config());

    assert!(!cache.access(0x3c, 8, AccessKind::Load));
    assert!(cache.access_single_line(0x00, AccessKind::Load));
    assert!(cache.access_single_line(0x40, AccessKind::Load));

    // One classification per call, however many lines it spans.
    assert_eq!(cache.stats().accesses(AccessKind::Load), 3);
}

#[test]
fn partially_resident_range_is_not_a_hit() {
    let cache = standalone(&four_way_config());
    let _ = cache.access_single_line(0x00, AccessKind::Load);

    assert!(!cache.access(0x30, 0x20, AccessKind::Load));
    assert_eq!(cache.stats().misses(AccessKind::Load), 2);
}

#[test]
fn store_allocates_by_default() {
    let cache = standalone(&four_way_config());

    assert!(!cache.access(0x2000, 4, AccessKind::Store));
    assert!(cache.access(0x2000, 4, AccessKind::Load));
}

#[test]
fn no_allocate_store_bypasses_the_cache() {
    let cache = standalone(&no_allocate_config());
    assert_eq!(cache.config().store_allocation, StoreAllocation::NoAllocate);

    assert!(!cache.access(0x2000, 4, AccessKind::Store));
    assert!(!cache.access(0x2000, 4, AccessKind::Load));
    assert!(cache.access(0x2000, 4, AccessKind::Store));
}

#[test]
fn fifth_line_in_a_set_evicts_the_first() {
    let cache = standalone(&four_way_config());
    let same_set = [0x0000, 0x1000, 0x2000, 0x3000, 0x4000];
    for addr in same_set {
        assert_eq!(cache.geometry().split(addr).1, 0);
        assert!(!cache.access_single_line(addr, AccessKind::Load));
    }

    assert!(cache.probe(0x0000).is_none());
    for addr in &same_set[1..] {
        assert!(cache.probe(*addr).is_some(), "{addr:#x}");
    }
}

#[test]
fn invalidate_reports_lookup_result() {
    let cache = standalone(&four_way_config());
    let _ = cache.access_single_line(0x80, AccessKind::Load);

    assert_eq!(cache.invalidate_single_line(0x80), AccessResult::Hit);
    assert_eq!(cache.invalidate_single_line(0x80), AccessResult::Miss);
    assert_eq!(cache.invalidate_single_line(0x88), AccessResult::Tombstone);

    let stats = cache.stats();
    assert_eq!(stats.hits(AccessKind::Invalidate), 1);
    assert_eq!(stats.misses(AccessKind::Invalidate), 1);
    assert_eq!(stats.tombstones(AccessKind::Invalidate), 1);
}

#[test]
fn invalidate_kind_is_routed_to_invalidation() {
    let cache = standalone(&four_way_config());
    let _ = cache.access(0x80, 8, AccessKind::Load);

    assert!(cache.access(0x80, 8, AccessKind::Invalidate));
    assert!(cache.probe(0x80).unwrap().is_dead());
    assert_eq!(cache.stats().accesses(AccessKind::Invalidate), 1);
}

#[test]
fn self_invalidated_line_misses_and_alias_hits_tombstone() {
    let cache = standalone(&no_allocate_config());
    let _ = cache.access_single_line(0x100, AccessKind::Load);
    let _ = cache.invalidate_single_line(0x100);

    assert!(!cache.access_single_line(0x100, AccessKind::Store));
    assert!(cache.interference_counts().is_empty());

    assert!(!cache.access_single_line(0x108, AccessKind::Store));
    assert_eq!(cache.interference_counts().get(0x100, 0x108), 1);
    assert!(!cache.access_single_line(0x108, AccessKind::Store));
    assert_eq!(cache.interference_counts().get(0x100, 0x108), 2);

    let stats = cache.stats();
    assert_eq!(stats.misses(AccessKind::Store), 1);
    assert_eq!(stats.tombstones(AccessKind::Store), 2);
}

#[test]
fn direct_mapped_never_reports_tombstones() {
    let cache = standalone(&CacheConfig::direct_mapped(16 * 1024, 64));
    let _ = cache.access_single_line(0x100, AccessKind::Load);

    assert_eq!(cache.invalidate_single_line(0x100), AccessResult::Hit);
    assert!(cache.access_single_line(0x108, AccessKind::Load));

    assert_eq!(cache.stats().total_tombstones(), 0);
    assert!(cache.interference_counts().is_empty());
}

#[test]
fn interference_sums_every_set() {
    let cache = standalone(&no_allocate_config());
    for base in [0x0000, 0x0040, 0x0080] {
        let _ = cache.access_single_line(base, AccessKind::Load);
        let _ = cache.invalidate_single_line(base);
        let _ = cache.access_single_line(base + 8, AccessKind::Store);
    }

    let counts = cache.interference_counts();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts.total(), 3);
    assert_eq!(counts.get(0x40, 0x48), 1);
}

/// Load 0, store 0x1000 (same set), invalidate 0, then touch word 8 of the
/// dead line. Stores do not allocate here: an allocating access to 8 would
/// refill the line, and the closing access to 0 would then hit instead of
/// finding its own tombstone. Way placement inside the set is covered by the
/// round-robin cursor tests.
#[test]
fn false_sharing_walkthrough() {
    let cache = standalone(&no_allocate_config());
    assert_eq!(cache.geometry().num_sets(), 64);
    assert_eq!(cache.geometry().split(0x0000), (0, 0));
    assert_eq!(cache.geometry().split(0x1000), (64, 0));

    assert!(!cache.access(0x0000, 8, AccessKind::Load));
    assert!(!cache.access(0x1000, 8, AccessKind::Store));

    assert_eq!(cache.invalidate(0x0000, 8), AccessResult::Hit);
    let dead = cache.probe(0x0000).unwrap();
    assert!(dead.is_dead());
    assert_eq!(dead.tombstone_address(), Some(0x0000));

    assert!(!cache.access(0x0008, 8, AccessKind::Store));
    assert_eq!(cache.interference_counts().get(0x0000, 0x0008), 1);

    assert!(!cache.access(0x0000, 8, AccessKind::Store));
    assert_eq!(cache.interference_counts().total(), 1);

    let stats = cache.stats();
    assert_eq!(stats.misses(AccessKind::Load), 1);
    assert_eq!(stats.misses(AccessKind::Store), 2);
    assert_eq!(stats.tombstones(AccessKind::Store), 1);
    assert_eq!(stats.hits(AccessKind::Invalidate), 1);
}

#[test]
fn invalid_geometry_never_builds_a_cache() {
    init_tracing();
    let config = CacheConfig::round_robin(16 * 1024, 48, 4);
    assert!(Cache::new("bad", &config, WriteLock::shared()).is_err());
}

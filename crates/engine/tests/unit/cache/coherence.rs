//! Cross-core coherence tests.
//!
//! Two caches share a write lock and are registered as each other's peers.
//! A store in one must tombstone the written range in the other without
//! disturbing its own copy.

use std::sync::Arc;
use std::thread;

use fshare_core::cache::{AccessResult, Cache, WriteLock};
use fshare_core::common::{AccessKind, ConfigError};
use fshare_core::config::BroadcastRange;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::{four_way_config, init_tracing, peer_pair};

const X: u64 = 0x1000;

#[test]
fn store_tombstones_peer_copy_with_store_address() {
    let (a, b) = peer_pair(&four_way_config());
    let _ = a.access(X, 8, AccessKind::Load);
    let _ = b.access(X + 8, 8, AccessKind::Load);

    assert!(a.access(X, 8, AccessKind::Store));

    let theirs = b.probe(X + 8).unwrap();
    assert!(theirs.is_dead());
    assert_eq!(theirs.tombstone_address(), Some(X));
    assert!(!a.probe(X).unwrap().is_dead());

    assert_eq!(b.stats().hits(AccessKind::Invalidate), 1);
    assert_eq!(a.stats().accesses(AccessKind::Invalidate), 0);
}

#[test]
fn peer_access_to_neighbouring_word_is_false_sharing() {
    let (a, b) = peer_pair(&four_way_config());
    let _ = a.access(X, 8, AccessKind::Load);
    let _ = b.access(X + 8, 8, AccessKind::Load);
    let _ = a.access(X, 8, AccessKind::Store);

    assert!(!b.access(X + 8, 8, AccessKind::Load));
    assert_eq!(b.stats().tombstones(AccessKind::Load), 1);
    assert_eq!(b.interference_counts().get(X, X + 8), 1);
    assert!(a.interference_counts().is_empty());
}

#[test]
fn peer_access_to_same_word_is_true_sharing() {
    let (a, b) = peer_pair(&four_way_config());
    let _ = b.access(X, 8, AccessKind::Load);
    let _ = a.access(X, 8, AccessKind::Store);

    assert!(!b.access(X, 8, AccessKind::Load));
    assert_eq!(b.stats().misses(AccessKind::Load), 2);
    assert!(b.interference_counts().is_empty());
}

#[test]
fn single_line_store_invalidates_that_line_only() {
    let (a, b) = peer_pair(&four_way_config());
    let _ = b.access_single_line(X, AccessKind::Load);
    let _ = b.access_single_line(X + 0x40, AccessKind::Load);

    let _ = a.access_single_line(X + 4, AccessKind::Store);

    assert_eq!(b.probe(X).unwrap().tombstone_address(), Some(X + 4));
    assert!(!b.probe(X + 0x40).unwrap().is_dead());
}

#[test]
fn load_does_not_broadcast() {
    let (a, b) = peer_pair(&four_way_config());
    let _ = b.access(X, 8, AccessKind::Load);
    let _ = a.access(X, 8, AccessKind::Load);

    assert!(!b.probe(X).unwrap().is_dead());
    assert_eq!(b.stats().accesses(AccessKind::Invalidate), 0);
}

#[test]
fn peer_without_the_line_counts_a_miss() {
    let (a, b) = peer_pair(&four_way_config());
    let _ = a.access(X, 8, AccessKind::Store);

    assert_eq!(b.stats().misses(AccessKind::Invalidate), 1);
    assert!(b.probe(X).is_none());
}

#[rstest]
#[case::requested(BroadcastRange::Requested, X)]
#[case::after_segmentation(BroadcastRange::AfterSegmentation, X + 0x40)]
fn broadcast_range_selects_invalidated_line(
    #[case] range: BroadcastRange,
    #[case] invalidated: u64,
) {
    let (a, b) = peer_pair(&four_way_config().with_broadcast_range(range));
    let _ = b.access_single_line(X, AccessKind::Load);
    let _ = b.access_single_line(X + 0x40, AccessKind::Load);

    let _ = a.access(X, 8, AccessKind::Store);

    for line in [X, X + 0x40] {
        let dead = b.probe(line).unwrap().is_dead();
        assert_eq!(dead, line == invalidated, "line {line:#x}");
    }
}

#[test]
fn after_segmentation_starts_past_a_multi_line_store() {
    let config = four_way_config().with_broadcast_range(BroadcastRange::AfterSegmentation);
    let (a, b) = peer_pair(&config);
    for line in [X, X + 0x40, X + 0x80] {
        let _ = b.access_single_line(line, AccessKind::Load);
    }

    let _ = a.access(X + 0x20, 0x40, AccessKind::Store);

    assert!(!b.probe(X).unwrap().is_dead());
    assert!(!b.probe(X + 0x40).unwrap().is_dead());
    assert_eq!(b.probe(X + 0x80).unwrap().tombstone_address(), Some(X + 0x80));
}

#[test]
fn cache_cannot_be_its_own_peer() {
    let (a, b) = peer_pair(&four_way_config());

    assert_eq!(
        a.register_peer(&a),
        Err(ConfigError::SelfPeer("a".to_owned()))
    );
    assert!(a.register_peers(&[Arc::clone(&b), Arc::clone(&a)]).is_err());
    assert_eq!(a.peer_count(), 1);
}

#[test]
fn dropped_peer_leaves_the_broadcast() {
    let (a, b) = peer_pair(&four_way_config());
    assert_eq!(a.peer_count(), 1);

    drop(b);
    assert_eq!(a.peer_count(), 0);
    assert!(!a.access(X, 8, AccessKind::Store));
}

#[test]
fn unwired_caches_do_not_see_each_other() {
    init_tracing();
    let lock = WriteLock::shared();
    let a = Cache::new("a", &four_way_config(), Arc::clone(&lock)).unwrap();
    let b = Cache::new("b", &four_way_config(), lock).unwrap();
    let _ = b.access(X, 8, AccessKind::Load);
    let _ = a.access(X, 8, AccessKind::Store);

    assert!(!b.probe(X).unwrap().is_dead());
}

#[test]
fn concurrent_stores_are_all_broadcast() {
    const ROUNDS: usize = 2_000;
    let (a, b) = peer_pair(&four_way_config());

    thread::scope(|scope| {
        let _ = scope.spawn(|| {
            for _ in 0..ROUNDS {
                let _ = a.access(X, 8, AccessKind::Store);
            }
        });
        let _ = scope.spawn(|| {
            for _ in 0..ROUNDS {
                let _ = b.access(X + 8, 8, AccessKind::Store);
            }
        });
    });

    let (ours, theirs) = (a.stats(), b.stats());
    assert_eq!(ours.accesses(AccessKind::Store), ROUNDS as u64);
    assert_eq!(theirs.accesses(AccessKind::Store), ROUNDS as u64);
    assert_eq!(ours.accesses(AccessKind::Invalidate), ROUNDS as u64);
    assert_eq!(theirs.accesses(AccessKind::Invalidate), ROUNDS as u64);

    // Whichever store went last left the other cache's copy tombstoned.
    let a_dead = a.probe(X).is_none_or(|line| line.is_dead());
    let b_dead = b.probe(X).is_none_or(|line| line.is_dead());
    assert!(a_dead || b_dead);
    assert_ne!(
        a.invalidate_single_line(X) == AccessResult::Hit,
        b.invalidate_single_line(X + 8) == AccessResult::Hit
    );
}

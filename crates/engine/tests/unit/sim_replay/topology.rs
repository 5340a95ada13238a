//! Topology wiring and replay tests.

use std::sync::Arc;

use fshare_core::common::{AccessKind, CacheType, ConfigError, TraceError};
use fshare_core::config::SimConfig;
use fshare_core::sim::{ReplaySummary, Topology, TraceOp, read_trace};
use pretty_assertions::assert_eq;

use crate::common::{four_way_config, init_tracing};

fn two_cores() -> Topology {
    init_tracing();
    Topology::new(2, &four_way_config()).unwrap()
}

#[test]
fn every_cache_knows_every_other() {
    init_tracing();
    let topology = Topology::new(4, &four_way_config()).unwrap();

    assert_eq!(topology.cores(), 4);
    for cache in topology.caches() {
        assert_eq!(cache.peer_count(), 3);
    }
    assert_eq!(topology.cache(2).unwrap().name(), "core2");
    assert!(topology.cache(4).is_none());

    // One write lock, held by the topology and by every cache.
    assert_eq!(Arc::strong_count(topology.write_lock()), 5);
}

#[test]
fn empty_topology_is_rejected() {
    assert_eq!(
        Topology::new(0, &four_way_config()).unwrap_err(),
        ConfigError::NoCores
    );
}

#[test]
fn bad_geometry_fails_the_whole_topology() {
    let mut config = SimConfig::default();
    config.cache.line_bytes = 48;
    assert_eq!(
        Topology::from_config(&config).unwrap_err(),
        ConfigError::LineSizeNotPowerOfTwo(48)
    );
}

#[test]
fn sequential_apply_detects_false_sharing() {
    let topology = two_cores();
    let ops = [
        TraceOp::new(0, AccessKind::Load, 0x1000, 8),
        TraceOp::new(1, AccessKind::Load, 0x1008, 8),
        TraceOp::new(0, AccessKind::Store, 0x1000, 8),
        TraceOp::new(1, AccessKind::Load, 0x1008, 8),
    ];
    let hits: Vec<bool> = ops.iter().map(|op| topology.apply(op)).collect();

    assert_eq!(hits, vec![false, false, true, false]);
    assert_eq!(topology.interference_counts().get(0x1000, 0x1008), 1);
    assert_eq!(topology.cache(1).unwrap().stats().tombstones(AccessKind::Load), 1);
}

#[test]
fn apply_ignores_unknown_core() {
    let topology = two_cores();
    assert!(!topology.apply(&TraceOp::new(7, AccessKind::Load, 0, 8)));
    assert_eq!(topology.total_stats().total_accesses(), 0);
}

#[test]
fn run_replays_each_core_in_order() {
    let topology = two_cores();
    let trace = "\
0 L 0x0000 8
1 L 0x0040 8
0 L 0x0000 8
1 L 0x0040 8
0 S 0x0000 8
1 S 0x0040 8
";
    let ops = read_trace(trace.as_bytes()).unwrap();
    let summary = topology.run(&ops).unwrap();

    assert_eq!(summary, ReplaySummary { operations: 6, hits: 4 });

    let total = topology.total_stats();
    assert_eq!(total.accesses(AccessKind::Load), 4);
    assert_eq!(total.accesses(AccessKind::Store), 2);
    // Each store is broadcast to the single peer, which never holds the line.
    assert_eq!(total.misses(AccessKind::Invalidate), 2);
    assert!(topology.interference_counts().is_empty());
}

#[test]
fn run_rejects_unknown_core_before_replaying() {
    let topology = two_cores();
    let ops = read_trace("0 L 0\n2 L 0\n".as_bytes()).unwrap();

    let err = topology.run(&ops).unwrap_err();
    assert!(matches!(err, TraceError::UnknownCore { line: 2, core: 2, cores: 2 }));
    assert_eq!(topology.total_stats().total_accesses(), 0);
}

#[test]
fn reports_and_summary_cover_every_core() {
    let topology = two_cores();
    let _ = topology.apply(&TraceOp::new(0, AccessKind::Load, 0x1000, 8));
    let _ = topology.apply(&TraceOp::new(1, AccessKind::Store, 0x1008, 8));
    let _ = topology.apply(&TraceOp::new(0, AccessKind::Load, 0x1010, 8));

    let report = topology.report(CacheType::Data);
    assert!(report.contains("core0:\n"));
    assert!(report.contains("core1:\n"));

    let summary = topology.summary();
    assert_eq!(summary.caches.len(), 2);
    assert_eq!(summary.caches[0].interference.get(0x1008, 0x1010), 1);
    assert_eq!(summary.interference.total(), 1);

    let json: serde_json::Value = serde_json::from_str(&topology.summary_json().unwrap()).unwrap();
    assert_eq!(json["caches"][1]["name"], "core1");
    assert_eq!(json["interference"][0]["lower"], 0x1008);
    assert_eq!(json["interference"][0]["count"], 1);
}

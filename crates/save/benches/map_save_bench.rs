//! Map persistence benchmarks.
//!
//! Measures the binary codec, LZ4 compression and OpenDRIVE export/import on
//! generated maps of linked road chains.
//!
//! Run with: `cargo bench -p save --bench map_save_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bevy::prelude::Vec2;
use network::link_graph::{LinkTarget, RoadEnd};
use network::{EngineParams, RoadMap, RoadSpec};
use save::{decode_map, encode_map, export_xodr, import_xodr, SaveMap};

const ROAD_COUNTS: [usize; 3] = [10, 100, 500];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rows of ten 40 m roads, each linked to the previous one in its row.
fn build_map(road_count: usize) -> RoadMap {
    let mut map = RoadMap::new(EngineParams::default());
    let mut previous = None;
    for i in 0..road_count {
        let column = (i % 10) as f32;
        let row = (i / 10) as f32;
        let from = Vec2::new(column * 40.0, row * 30.0);
        let mut spec = RoadSpec::straight(from, from + Vec2::new(40.0, 0.0));
        if i % 10 != 0 {
            if let Some(prev) = previous {
                spec = spec.with_predecessor(LinkTarget::Road(RoadEnd::end(prev)));
            }
        }
        previous = Some(map.create_road(spec).expect("create road"));
    }
    map.take_changed();
    map
}

// ---------------------------------------------------------------------------
// Binary codec
// ---------------------------------------------------------------------------

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_snapshot");
    for count in ROAD_COUNTS {
        let map = build_map(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &map, |b, map| {
            b.iter(|| black_box(SaveMap::from_map(map)));
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_encode");
    for count in ROAD_COUNTS {
        let map = build_map(count);
        group.bench_with_input(BenchmarkId::new("raw", count), &map, |b, map| {
            b.iter(|| black_box(encode_map(map, false)));
        });
        group.bench_with_input(BenchmarkId::new("lz4", count), &map, |b, map| {
            b.iter(|| black_box(encode_map(map, true)));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_decode");
    for count in ROAD_COUNTS {
        let map = build_map(count);
        let raw = encode_map(&map, false);
        let packed = encode_map(&map, true);
        group.bench_with_input(BenchmarkId::new("raw", count), &raw, |b, bytes| {
            b.iter(|| black_box(decode_map(bytes).expect("decode")));
        });
        group.bench_with_input(BenchmarkId::new("lz4", count), &packed, |b, bytes| {
            b.iter(|| black_box(decode_map(bytes).expect("decode")));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// OpenDRIVE
// ---------------------------------------------------------------------------

fn bench_xodr(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_xodr");
    group.sample_size(20);
    for count in ROAD_COUNTS {
        let map = build_map(count);
        let xml = export_xodr(&map);
        group.bench_with_input(BenchmarkId::new("export", count), &map, |b, map| {
            b.iter(|| black_box(export_xodr(map).len()));
        });
        group.bench_with_input(BenchmarkId::new("import", count), &xml, |b, xml| {
            b.iter(|| black_box(import_xodr(xml).expect("import").road_count()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_snapshot, bench_encode, bench_decode, bench_xodr);
criterion_main!(benches);

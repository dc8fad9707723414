//! # Mask Benchmarks
//!
//! Performance benchmarks for ecalmask-core queries.
//!
//! Run with: `cargo bench -p ecalmask-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ecalmask_core::geometry::ic_eb;
use ecalmask_core::{
    ConditionsEpoch, EbDetId, EcalSubdetector, EpochId, MaskSnapshot, StatusCode, StatusTable,
};
use std::hint::black_box;

/// Snapshot with every `stride`-th crystal of every supermodule flagged.
fn create_snapshot(stride: i32) -> MaskSnapshot {
    let mut channels = StatusTable::new();
    let mut towers = StatusTable::new();
    for sm in 1..=36 {
        for ic in (1..=1700).step_by(stride.max(1) as usize) {
            if let Ok(id) = EbDetId::from_sm_crystal(sm, ic) {
                channels.set(id.raw_id(), StatusCode::new(0x1));
                towers.merge(id.tower().raw_id(), StatusCode::new(0x8));
            }
        }
    }
    MaskSnapshot::resolve(
        &ConditionsEpoch::new(EpochId(1))
            .with_channel_status(channels)
            .with_tower_status(towers),
        false,
    )
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_mask_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask_channel");

    for stride in [1, 10, 100].iter() {
        let snapshot = create_snapshot(*stride);
        group.bench_with_input(BenchmarkId::from_parameter(stride), stride, |b, _| {
            b.iter(|| {
                let mut masked = 0;
                for iy in 1..=85 {
                    for ix in 1..=20 {
                        if snapshot
                            .mask_channel(black_box(7), ix, iy, 0x2, EcalSubdetector::Barrel)
                            .unwrap_or(false)
                        {
                            masked += 1;
                        }
                    }
                }
                black_box(masked)
            });
        });
    }

    group.finish();
}

fn bench_scan_module(c: &mut Criterion) {
    let snapshot = create_snapshot(10);
    let mut group = c.benchmark_group("scan_module");

    group.bench_function("barrel", |b| {
        b.iter(|| black_box(snapshot.scan_module(black_box(12), 0x9, EcalSubdetector::Barrel)))
    });
    group.bench_function("endcap", |b| {
        b.iter(|| black_box(snapshot.scan_module(black_box(4), 0x9, EcalSubdetector::Endcap)))
    });

    group.finish();
}

fn bench_ic_eb(c: &mut Criterion) {
    c.bench_function("ic_eb", |b| {
        b.iter(|| {
            let mut sum = 0;
            for iy in 1..=85 {
                for ix in 1..=20 {
                    sum += ic_eb(black_box(ix), iy);
                }
            }
            black_box(sum)
        })
    });
}

criterion_group!(benches, bench_mask_channel, bench_scan_module, bench_ic_eb);
criterion_main!(benches);

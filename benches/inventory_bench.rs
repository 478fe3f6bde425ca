//! Performance benchmarks for the inventory hot path.
//!
//! Every tag read from the reader goes through `InventorySession::on_read`,
//! and every heartbeat through `on_tick`. These benchmarks measure both with
//! realistic tag populations.
//!
//! # Run Benchmarks
//!
//! ```sh
//! # Run all inventory benchmarks
//! cargo bench --bench inventory_bench
//!
//! # Run a specific group
//! cargo bench --bench inventory_bench -- session_read
//!
//! # Compare against a saved baseline
//! cargo bench --bench inventory_bench -- --save-baseline before
//! cargo bench --bench inventory_bench -- --baseline before
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use grokker_core::{Epc, TagRead, Timestamp};
use grokker_inventory::{
    EpcFilter, InventoryConfig, InventoryObserver, InventorySession, TagAggregate, TagEvent,
};
use std::hint::black_box;
use std::sync::Arc;

struct NullObserver;

impl InventoryObserver for NullObserver {
    fn on_tag_state(&self, event: &TagEvent) {
        black_box(event);
    }
}

fn epcs(count: u32) -> Vec<Epc> {
    (0..count)
        .map(|n| {
            let mut bytes = [0u8; 12];
            bytes[8..].copy_from_slice(&n.to_be_bytes());
            Epc::new(&bytes).unwrap()
        })
        .collect()
}

fn session(filter: EpcFilter) -> InventorySession {
    InventorySession::start(Arc::new(NullObserver), InventoryConfig::default(), filter).unwrap()
}

/// Benchmark recording reads into a single aggregate.
fn bench_aggregate_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_record");
    group.throughput(Throughput::Elements(1));

    let epc = epcs(1).remove(0);
    group.bench_function("same_interval", |b| {
        let mut aggregate = TagAggregate::new(epc.clone(), 500, 20);
        b.iter(|| black_box(aggregate.record_read(black_box(1_000))));
    });

    group.bench_function("advancing", |b| {
        let mut aggregate = TagAggregate::new(epc.clone(), 500, 20);
        let mut t: Timestamp = 0;
        b.iter(|| {
            t += 37;
            black_box(aggregate.record_read(black_box(t)))
        });
    });

    group.bench_function("find_rate", |b| {
        let mut aggregate = TagAggregate::new(epc.clone(), 500, 20);
        for t in (0..10_000).step_by(50) {
            aggregate.record_read(t);
        }
        b.iter(|| black_box(aggregate.find_rate(black_box(10_000))));
    });

    group.finish();
}

/// Benchmark session reads across tag populations.
fn bench_session_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_read");

    for population in [1u32, 100, 1_000] {
        group.throughput(Throughput::Elements(u64::from(population)));
        let tags = epcs(population);

        group.bench_with_input(
            BenchmarkId::new("pass_all", population),
            &tags,
            |b, tags| {
                let session = session(EpcFilter::all());
                let mut t: Timestamp = 0;
                b.iter(|| {
                    t += 1;
                    for epc in tags {
                        black_box(session.on_read(TagRead::new(epc.clone(), t)).ok());
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("deny_half", population),
            &tags,
            |b, tags| {
                let session = session(EpcFilter::deny(tags.iter().step_by(2).cloned()));
                let mut t: Timestamp = 0;
                b.iter(|| {
                    t += 1;
                    for epc in tags {
                        black_box(session.on_read(TagRead::new(epc.clone(), t)).ok());
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the stale sweep with a populated session.
fn bench_session_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_tick");

    for population in [100u32, 1_000] {
        group.throughput(Throughput::Elements(u64::from(population)));
        let tags = epcs(population);

        group.bench_with_input(
            BenchmarkId::new("no_stale", population),
            &tags,
            |b, tags| {
                let session = session(EpcFilter::all());
                for epc in tags {
                    session.on_read(TagRead::new(epc.clone(), 0)).ok();
                }
                b.iter(|| black_box(session.on_tick(black_box(5_000)).ok()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_aggregate_record,
    bench_session_read,
    bench_session_tick
);
criterion_main!(benches);

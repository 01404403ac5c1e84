//! Benchmark harness using Criterion for latency measurement.
//!
//! Each case runs against both representations:
//! - Place order (no match)
//! - Place order (full match against a queue of depth N)
//! - Cancel order
//! - Random mixed workload
//! - Depth snapshot and state hash

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use matchbook::{
    l2_snapshot, state_hash, BookConfig, Engine, OrderBookImplType, OrderCommand, OrderMode, Side,
    SymbolType,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const VARIANTS: [OrderBookImplType; 2] = [OrderBookImplType::Naive, OrderBookImplType::Fast];

fn engine(impl_type: OrderBookImplType) -> Engine {
    let config = BookConfig::default().with_order_capacity(100_000);
    let mut engine = Engine::new(impl_type, 1, SymbolType::CurrencyExchangePair, config)
        .expect("default config is valid");
    engine.warm_up();
    engine
}

/// Generate a random GTC place command around 10000
fn random_place(rng: &mut ChaCha8Rng, order_id: u64) -> OrderCommand {
    OrderCommand::place(
        OrderMode::Gtc,
        order_id,
        rng.gen_range(1..1000),
        rng.gen_range(9900..10100),
        rng.gen_range(1..1000),
        if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask },
    )
}

/// Benchmark: Place order that rests (no matching)
fn bench_place_no_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_no_match");

    for impl_type in VARIANTS {
        group.bench_function(BenchmarkId::from_parameter(format!("{impl_type:?}")), |b| {
            let mut engine = engine(impl_type);
            let mut order_id = 0u64;
            b.iter(|| {
                order_id += 1;
                // Below any asks, spread over 64 levels
                let mut cmd = OrderCommand::place(
                    OrderMode::Gtc,
                    order_id,
                    1,
                    9000 + order_id % 64,
                    100,
                    Side::Bid,
                );
                black_box(engine.process_command(&mut cmd))
            })
        });
    }
    group.finish();
}

/// Benchmark: Place order that fully matches
fn bench_place_full_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_full_match");

    for impl_type in VARIANTS {
        for depth in [1u64, 10, 100] {
            let id = BenchmarkId::new(format!("{impl_type:?}"), depth);
            group.bench_with_input(id, &depth, |b, &depth| {
                let mut engine = engine(impl_type);
                let mut order_id = 0u64;

                // Pre-populate with resting asks
                for _ in 0..depth {
                    order_id += 1;
                    let mut cmd =
                        OrderCommand::place(OrderMode::Gtc, order_id, 1, 10000, 100, Side::Ask);
                    engine.process_command(&mut cmd);
                }

                b.iter(|| {
                    // Take the head ask, then replace it at the back
                    order_id += 1;
                    let mut bid =
                        OrderCommand::place(OrderMode::Gtc, order_id, 2, 10000, 100, Side::Bid);
                    black_box(engine.process_command(&mut bid));

                    order_id += 1;
                    let mut ask =
                        OrderCommand::place(OrderMode::Gtc, order_id, 1, 10000, 100, Side::Ask);
                    black_box(engine.process_command(&mut ask));
                })
            });
        }
    }
    group.finish();
}

/// Benchmark: Place then cancel from the middle of a level
fn bench_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_cancel");

    for impl_type in VARIANTS {
        group.bench_function(BenchmarkId::from_parameter(format!("{impl_type:?}")), |b| {
            let mut engine = engine(impl_type);
            for id in 1..=1000u64 {
                let price = 9000 + id % 32;
                let mut cmd = OrderCommand::place(OrderMode::Gtc, id, 1, price, 10, Side::Bid);
                engine.process_command(&mut cmd);
            }

            let mut order_id = 1_000_000u64;
            b.iter(|| {
                order_id += 1;
                let mut place =
                    OrderCommand::place(OrderMode::Gtc, order_id, 1, 9010, 10, Side::Bid);
                engine.process_command(&mut place);
                let mut cancel = OrderCommand::cancel(order_id, 1);
                black_box(engine.process_command(&mut cancel))
            })
        });
    }
    group.finish();
}

/// Benchmark: Random place workload (deterministic seed)
fn bench_random_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_place");

    for impl_type in VARIANTS {
        group.bench_function(BenchmarkId::from_parameter(format!("{impl_type:?}")), |b| {
            let mut engine = engine(impl_type);
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let mut order_id = 0u64;
            b.iter(|| {
                order_id += 1;
                let mut cmd = random_place(&mut rng, order_id);
                black_box(engine.process_command(&mut cmd))
            })
        });
    }
    group.finish();
}

/// Benchmark: Read-only views over a populated book
fn bench_snapshot_and_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for impl_type in VARIANTS {
        let mut engine = engine(impl_type);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for order_id in 1..=10_000 {
            let mut cmd = random_place(&mut rng, order_id);
            engine.process_command(&mut cmd);
        }

        group.bench_function(BenchmarkId::new("l2_depth_10", format!("{impl_type:?}")), |b| {
            b.iter(|| black_box(l2_snapshot(engine.book(), Some(10))))
        });
        group.bench_function(BenchmarkId::new("state_hash", format!("{impl_type:?}")), |b| {
            b.iter(|| black_box(state_hash(engine.book())))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_place_no_match,
    bench_place_full_match,
    bench_cancel,
    bench_random_workload,
    bench_snapshot_and_hash,
);

criterion_main!(benches);

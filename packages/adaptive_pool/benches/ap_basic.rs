//! Basic benchmarks for the `adaptive_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::time::Instant;

use adaptive_pool::AdaptivePool;
use criterion::{Criterion, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = Vec<u8>;
const SLOT_COUNT: usize = 64;

fn static_pool() -> AdaptivePool<TestItem> {
    AdaptivePool::builder()
        .initializer(|| vec![Vec::with_capacity(1024); SLOT_COUNT])
        .build()
        .unwrap()
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("ap_basic");

    group.bench_function("build", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(static_pool()));
            }

            start.elapsed()
        });
    });

    group.bench_function("acquire_release_one", |b| {
        let pool = static_pool();

        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let lease = black_box(pool.acquire().unwrap());
                pool.release(lease);
            }

            start.elapsed()
        });
    });

    group.bench_function("acquire_release_all", |b| {
        let pool = static_pool();
        let mut leases = Vec::with_capacity(SLOT_COUNT);

        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                leases.extend(std::iter::from_fn(|| pool.acquire()));
                for lease in leases.drain(..) {
                    pool.release(lease);
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("shrink_and_regrow", |b| {
        // Every acquire first restores all released slots, then releases one of them again.
        let pool = AdaptivePool::builder()
            .initializer(|| vec![Vec::<u8>::new(); SLOT_COUNT])
            .should_release(|active| active == SLOT_COUNT)
            .can_restore(|active| active < SLOT_COUNT)
            .restore(|_| Some(Vec::new()))
            .build()
            .unwrap();

        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(pool.acquire()));
            }

            start.elapsed()
        });
    });

    group.finish();
}

//! Micro benchmarks for least-connections upstream selection.
//! Pure CPU - no network, no IO.
//!
//! ```bash
//! cargo bench --bench bench_router
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use proxy_lib::config::UpstreamRef;
use proxy_lib::routing::UpstreamRouter;

fn upstreams(n: usize) -> Vec<UpstreamRef> {
    (0..n).map(|i| UpstreamRef { address: format!("10.0.0.{i}:9000") }).collect()
}

fn bench_acquire_release_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_acquire_release");
    for pool_size in [2_usize, 8, 32] {
        let router = UpstreamRouter::new(&upstreams(pool_size));
        group.bench_with_input(BenchmarkId::from_parameter(pool_size), &pool_size, |b, _| {
            b.iter(|| {
                let guard = router.acquire().expect("non-empty pool");
                std::hint::black_box(guard.address());
            });
        });
    }
    group.finish();
}

fn bench_acquire_under_contention(c: &mut Criterion) {
    let router = UpstreamRouter::new(&upstreams(16));
    // Pre-load uneven load so every acquire must scan for the minimum.
    let held: Vec<_> = (0..200).map(|_| router.acquire().expect("non-empty pool")).collect();
    std::hint::black_box(&held);

    c.bench_function("router_acquire_with_200_outstanding", |b| {
        b.iter(|| {
            let guard = router.acquire().expect("non-empty pool");
            std::hint::black_box(guard.address());
        });
    });
}

criterion_group!(benches, bench_acquire_release_cycle, bench_acquire_under_contention);
criterion_main!(benches);

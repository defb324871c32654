//! Micro benchmarks for the rate-limit manager's `add`/`release` hot path.
//! Pure CPU - no network, no IO.
//!
//! ```bash
//! cargo bench --bench bench_rate_limit
//! ```

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use proxy_lib::config::RateLimitConfig;
use proxy_lib::security::rate_limit::{MockClock, RateLimitManager};

fn manager(cfg: RateLimitConfig) -> RateLimitManager {
    let clock = Arc::new(MockClock::new(1));
    RateLimitManager::new("bench@app".to_string(), cfg, clock)
}

fn bench_add_release_unbounded(c: &mut Criterion) {
    let cfg = RateLimitConfig { max_open_connections: -1, max_rate_amount: -1, max_rate_period_seconds: 1 };
    let m = manager(cfg);

    c.bench_function("rate_limit_add_release_unbounded", |b| {
        b.iter(|| {
            assert!(m.add());
            m.release();
        });
    });
}

fn bench_add_under_sliding_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_limit_add_sliding_window");
    for amount in [8_u32, 64, 512] {
        let cfg = RateLimitConfig {
            max_open_connections: -1,
            max_rate_amount: amount as i64,
            max_rate_period_seconds: 60,
        };
        let clock = Arc::new(MockClock::new(1));
        let m = RateLimitManager::new("bench@app".to_string(), cfg, Arc::clone(&clock));
        // Fill the window once so every further `add` exercises the trim path.
        for _ in 0..amount {
            m.add();
            m.release();
        }

        group.bench_with_input(BenchmarkId::from_parameter(amount), &amount, |b, _| {
            b.iter(|| {
                m.add();
                m.release();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_release_unbounded, bench_add_under_sliding_window);
criterion_main!(benches);

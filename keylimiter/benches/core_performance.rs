use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keylimiter::store::{KeyValueStore, TtlStore};
use keylimiter::{KeyLimiter, ManualClock, SlidingWindowLimiter, TokenBucketLimiter, WindowUnit};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn limiters() -> Vec<(&'static str, Arc<dyn KeyLimiter>)> {
    vec![
        (
            "token_bucket",
            Arc::new(TokenBucketLimiter::new(1000, 10_000.0).unwrap()) as Arc<dyn KeyLimiter>,
        ),
        (
            "sliding_window",
            Arc::new(SlidingWindowLimiter::new(10_000, WindowUnit::Second).unwrap())
                as Arc<dyn KeyLimiter>,
        ),
    ]
}

fn benchmark_core_limiters(c: &mut Criterion) {
    let mut group = c.benchmark_group("core_limiters");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(10));

    for (name, limiter) in limiters() {
        group.bench_function(format!("{name}/single_key_allowed"), |b| {
            b.iter(|| black_box(limiter.allow(black_box("test_key"))));
        });

        // Multiple keys to simulate real-world usage
        group.bench_function(format!("{name}/rotating_keys_100"), |b| {
            let mut counter = 0u64;

            b.iter(|| {
                let key = format!("key_{}", counter % 100);
                counter += 1;
                black_box(limiter.allow(black_box(&key)))
            });
        });

        group.bench_function(format!("{name}/check"), |b| {
            b.iter(|| black_box(limiter.check(black_box("check_key"))));
        });
    }

    // Rate limit exceeded (worst case): a frozen clock never refills
    group.bench_function("token_bucket/single_key_denied", |b| {
        let limiter = TokenBucketLimiter::builder(5, 1.0)
            .clock(ManualClock::new())
            .build()
            .unwrap();
        while limiter.allow("exhausted_key") {}

        b.iter(|| black_box(limiter.allow(black_box("exhausted_key"))));
    });

    group.bench_function("sliding_window/single_key_denied", |b| {
        let limiter = SlidingWindowLimiter::builder(5, WindowUnit::Hour)
            .clock(ManualClock::new())
            .build()
            .unwrap();
        while limiter.allow("exhausted_key") {}

        b.iter(|| black_box(limiter.allow(black_box("exhausted_key"))));
    });

    group.finish();
}

fn benchmark_store_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_growth");
    group.throughput(Throughput::Elements(1));

    // Growing number of unique keys
    for num_keys in [10, 100, 1000, 10000] {
        group.bench_with_input(
            format!("unique_keys_{num_keys}"),
            &num_keys,
            |b, &num_keys| {
                let clock = ManualClock::new();
                let mut store: TtlStore<u64> = TtlStore::new(60.0, clock.clone());
                let mut counter = 0u64;

                b.iter(|| {
                    let key = format!("key_{}", counter % num_keys);
                    counter += 1;
                    clock.advance(0.001);

                    let value = store.get(&key).unwrap_or(0);
                    store.set(black_box(&key), black_box(value + 1));
                });
            },
        );
    }

    // Every key expires shortly after being written
    group.bench_function("expiring_keys", |b| {
        let clock = ManualClock::new();
        let mut store: TtlStore<u64> = TtlStore::new(1.0, clock.clone());
        let mut counter = 0u64;

        b.iter(|| {
            let key = format!("key_{counter}");
            counter += 1;
            clock.advance(0.01);
            store.set(black_box(&key), black_box(counter));
        });
    });

    group.finish();
}

fn benchmark_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    group.measurement_time(Duration::from_secs(10));

    const THREADS: usize = 4;
    const OPS_PER_THREAD: u64 = 1000;
    group.throughput(Throughput::Elements(THREADS as u64 * OPS_PER_THREAD));

    for (name, limiter) in limiters() {
        group.bench_function(format!("{name}/threads_{THREADS}"), |b| {
            b.iter(|| {
                let handles: Vec<_> = (0..THREADS)
                    .map(|worker| {
                        let limiter = Arc::clone(&limiter);
                        thread::spawn(move || {
                            for i in 0..OPS_PER_THREAD {
                                let key = format!("key_{}", (i + worker as u64) % 100);
                                black_box(limiter.allow(&key));
                            }
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_core_limiters,
    benchmark_store_growth,
    benchmark_contention
);
criterion_main!(benches);

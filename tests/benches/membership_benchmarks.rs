//! # nsbloom Membership Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Scaling filter | add / check with and without stage growth |
//! | Persistence | flush of a dirty filter |
//! | Router | POST and GET through the full request path |

use std::time::Duration;

use axum::http::Method;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nsbloom_core::{RequestParams, ServerConfig, ServerContext};
use nsbloom_filters::{FilterConfig, MembershipFilter, PersistentFilter, ScalingBloomFilter};
use rand::Rng;
use tempfile::TempDir;

fn random_keys(count: usize) -> Vec<[u8; 16]> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let mut key = [0u8; 16];
            rng.fill(&mut key);
            key
        })
        .collect()
}

// ============================================================================
// Scaling filter
// ============================================================================

fn bench_scaling_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling-filter");
    group.measurement_time(Duration::from_secs(10));

    for capacity in [10_000usize, 100_000] {
        let keys = random_keys(capacity);
        let config = FilterConfig::default().with_capacity(capacity);

        group.throughput(Throughput::Elements(capacity as u64));
        group.bench_with_input(BenchmarkId::new("add_single_stage", capacity), &keys, |b, keys| {
            b.iter(|| {
                let mut filter = ScalingBloomFilter::new(config.clone());
                for (id, key) in keys.iter().enumerate() {
                    filter.add(key, id as u64);
                }
                black_box(filter.len())
            })
        });

        // Capacity a quarter of the key count forces four stages
        let small = FilterConfig::default().with_capacity(capacity / 4);
        group.bench_with_input(BenchmarkId::new("add_growing", capacity), &keys, |b, keys| {
            b.iter(|| {
                let mut filter = ScalingBloomFilter::new(small.clone());
                for (id, key) in keys.iter().enumerate() {
                    filter.add(key, id as u64);
                }
                black_box(filter.stages().len())
            })
        });

        let mut filter = ScalingBloomFilter::new(small.clone());
        for (id, key) in keys.iter().enumerate() {
            filter.add(key, id as u64);
        }
        let misses = random_keys(capacity);
        group.bench_with_input(BenchmarkId::new("check_miss", capacity), &misses, |b, misses| {
            b.iter(|| misses.iter().filter(|k| filter.check(k.as_slice())).count())
        });
    }

    group.finish();
}

// ============================================================================
// Persistence
// ============================================================================

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    group.sample_size(20);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bench.bf");
    let config = FilterConfig::default().with_capacity(100_000);
    let mut filter = PersistentFilter::create(&path, &config).unwrap();
    let keys = random_keys(100_000);

    group.bench_function("flush_100k", |b| {
        let mut next = keys.iter().enumerate().cycle();
        b.iter(|| {
            // One fresh add marks the filter dirty
            if let Some((id, key)) = next.next() {
                filter.add(key, id as u64);
            }
            filter.flush().unwrap();
        })
    });

    group.finish();
}

// ============================================================================
// Router
// ============================================================================

fn bench_router(c: &mut Criterion) {
    let mut group = c.benchmark_group("router");

    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::for_dir(dir.path());
    config.filter = config.filter.with_capacity(1_000_000);
    let context = ServerContext::<PersistentFilter>::bootstrap(config).unwrap();
    let router = context.router();

    let mut counter = 0u64;
    group.bench_function("post_new_key", |b| {
        b.iter(|| {
            counter += 1;
            let params = RequestParams {
                key: Some(format!("key-{counter}").into_bytes()),
                ns: Some(format!("ns{}", counter % 8).into_bytes()),
                metrics: None,
            };
            black_box(router.handle(&Method::POST, &params))
        })
    });

    let hit = RequestParams {
        key: Some("key-1".into()),
        ns: Some("ns1".into()),
        metrics: None,
    };
    group.bench_function("get_hit", |b| {
        b.iter(|| black_box(router.handle(&Method::GET, &hit)))
    });

    group.finish();
}

criterion_group!(benches, bench_scaling_filter, bench_flush, bench_router);
criterion_main!(benches);

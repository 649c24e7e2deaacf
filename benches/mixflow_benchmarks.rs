//! # Mixflow Performance Benchmarks
//!
//! Benchmarks for the hot paths of the selection engine: compatibility
//! scoring, catalogue filtering, and the full per-call selection decision.
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench selection
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use mixflow::catalogue::{Catalogue, FilterCriteria};
use mixflow::keys::KeyProgression;
use mixflow::random::{RandomConfig, RandomSource};
use mixflow::selector::{SelectorConfig, SongSelector};
use mixflow::track::Track;

fn benchmark_catalogue(size: u32) -> Catalogue {
    Catalogue::new(
        (1..=size)
            .map(|i| Track {
                id: i,
                artist: format!("Artist {}", i % 40),
                title: format!("Track {i}"),
                key: ((i - 1) % 12 + 1) as u8,
                native_tempo: 94,
            })
            .collect(),
    )
    .expect("benchmark catalogue is valid")
}

/// Random source kept off the real network: refills fall back locally.
fn offline_random() -> RandomSource {
    RandomSource::new(RandomConfig {
        entropy_base_url: Some("http://192.0.2.1/api".to_string()),
        refill_timeout_secs: 1,
        ..RandomConfig::default()
    })
    .expect("random source builds")
}

fn bench_compatibility(c: &mut Criterion) {
    c.bench_function("compatibility_full_table_scan", |b| {
        b.iter(|| {
            let mut total = 0u32;
            for a in 1..=12u8 {
                for k in 1..=12u8 {
                    total += u32::from(KeyProgression::score_compatibility(
                        black_box(a),
                        black_box(k),
                    ));
                }
            }
            total
        });
    });

    c.bench_function("compatible_keys_ordering", |b| {
        b.iter(|| KeyProgression::compatible_keys(black_box(7)));
    });
}

fn bench_catalogue(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalogue");
    for size in [100u32, 1000, 5000] {
        let catalogue = benchmark_catalogue(size);
        group.bench_with_input(BenchmarkId::new("filter_by_key", size), &catalogue, |b, cat| {
            b.iter(|| cat.filter(&FilterCriteria::by_key(black_box(5))));
        });
        group.bench_with_input(BenchmarkId::new("stats", size), &catalogue, |b, cat| {
            b.iter(|| cat.stats());
        });
        group.bench_with_input(BenchmarkId::new("search", size), &catalogue, |b, cat| {
            b.iter(|| cat.search(black_box("artist 3")));
        });
    }
    group.finish();
}

fn bench_selection(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    c.bench_function("selection_full_decision", |b| {
        b.iter_batched(
            || {
                SongSelector::new(
                    benchmark_catalogue(1000),
                    offline_random(),
                    SelectorConfig::default(),
                )
            },
            |mut selector| {
                runtime.block_on(async {
                    for _ in 0..10 {
                        black_box(selector.select_track().await.expect("selection succeeds"));
                    }
                })
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_compatibility,
    bench_catalogue,
    bench_selection
);
criterion_main!(benches);

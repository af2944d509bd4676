//! Benchmarks for graph construction and search.
//!
//! Run with: cargo bench --bench vamana_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vamana::prelude::*;

const DIM: usize = 64;

/// Generate random vectors for benchmarking.
fn generate_vectors(count: usize, dim: usize) -> Vec<Vec<f32>> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect())
        .collect()
}

fn populated(vectors: &[Vec<f32>], config: GraphConfig) -> VamanaGraph<f32> {
    let mut graph = VamanaGraph::with_metric(Metric::L2, config);
    for v in vectors {
        graph.create_node(v.clone(), None).unwrap();
    }
    graph
}

/// Benchmark a full Vamana build at several sizes.
fn bench_vamana_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("vamana_build");
    group.sample_size(10);

    for size in [250, 500, 1000] {
        let vectors = generate_vectors(size, DIM);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut graph = populated(&vectors, GraphConfig::new().with_seed(1));
                graph.vamana(black_box(&VamanaParams::new(64, 24, 1.2))).unwrap();
                graph
            });
        });
    }

    group.finish();
}

/// Benchmark builds with varying degree bound (R).
fn bench_vamana_build_varying_degree(c: &mut Criterion) {
    let mut group = c.benchmark_group("vamana_build_degree");
    group.sample_size(10);

    let vectors = generate_vectors(500, DIM);
    for r in [8, 16, 32, 48] {
        group.bench_with_input(BenchmarkId::from_parameter(r), &r, |b, &r| {
            b.iter(|| {
                let mut graph = populated(&vectors, GraphConfig::new().with_seed(1));
                graph.vamana(&VamanaParams::new(64, r, 1.2)).unwrap();
                graph
            });
        });
    }

    group.finish();
}

/// Benchmark builds with varying alpha.
fn bench_vamana_build_varying_alpha(c: &mut Criterion) {
    let mut group = c.benchmark_group("vamana_build_alpha");
    group.sample_size(10);

    let vectors = generate_vectors(500, DIM);
    for alpha in [1.0f32, 1.2, 1.4] {
        group.bench_with_input(BenchmarkId::from_parameter(alpha), &alpha, |b, &alpha| {
            b.iter(|| {
                let mut graph = populated(&vectors, GraphConfig::new().with_seed(1));
                graph.vamana(&VamanaParams::new(64, 24, alpha)).unwrap();
                graph
            });
        });
    }

    group.finish();
}

/// Benchmark serial against worker-pool builds.
fn bench_vamana_build_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("vamana_build_threads");
    group.sample_size(10);

    let vectors = generate_vectors(1000, DIM);
    for n_threads in [1, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(n_threads), &n_threads, |b, &n| {
            b.iter(|| {
                let config = GraphConfig::new().with_threads(n).with_seed(1);
                let mut graph = populated(&vectors, config);
                graph.vamana(&VamanaParams::new(64, 24, 1.2)).unwrap();
                graph
            });
        });
    }

    group.finish();
}

/// Benchmark top-10 search with both candidate-list strategies.
fn bench_search_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("vamana_search_strategy");

    let vectors = generate_vectors(2000, DIM);
    let mut graph = populated(&vectors, GraphConfig::new().with_seed(1));
    graph.vamana(&VamanaParams::new(64, 24, 1.2)).unwrap();
    let medoid = graph.medoid().unwrap();
    let queries = generate_vectors(100, DIM);

    for strategy in [SearchStrategy::HashSet, SearchStrategy::PriorityQueue] {
        let name = format!("{strategy:?}");
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            let mut i = 0;
            b.iter(|| {
                let q = &queries[i % queries.len()];
                i += 1;
                graph
                    .greedy_search_with(strategy, medoid, black_box(q), 10, 64)
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark search with varying beam width (L).
fn bench_search_varying_l(c: &mut Criterion) {
    let mut group = c.benchmark_group("vamana_search_l");

    let vectors = generate_vectors(2000, DIM);
    let mut graph = populated(&vectors, GraphConfig::new().with_seed(1));
    graph.vamana(&VamanaParams::new(64, 24, 1.2)).unwrap();
    let queries = generate_vectors(100, DIM);

    for l in [10, 32, 64, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(l), &l, |b, &l| {
            let mut i = 0;
            b.iter(|| {
                let q = &queries[i % queries.len()];
                i += 1;
                graph.search(black_box(q), 10, Some(l)).unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark the filtered and stitched builders on a categorized set.
fn bench_filtered_builds(c: &mut Criterion) {
    let mut group = c.benchmark_group("vamana_filtered_build");
    group.sample_size(10);

    let vectors = generate_vectors(800, DIM);
    let categorized = |config: GraphConfig| {
        let mut graph = VamanaGraph::<f32>::with_metric(Metric::L2, config);
        for (i, v) in vectors.iter().enumerate() {
            graph.create_node(v.clone(), Some((i % 8) as Category)).unwrap();
        }
        graph
    };

    group.bench_function("filtered", |b| {
        b.iter(|| {
            let mut graph = categorized(GraphConfig::new().with_seed(1));
            graph
                .filtered_vamana(&FilteredVamanaParams::new(48, 16, 1.2, 0.5))
                .unwrap();
            graph
        });
    });
    group.bench_function("stitched", |b| {
        b.iter(|| {
            let mut graph = categorized(GraphConfig::new().with_seed(1));
            graph
                .stitched_vamana(&StitchedVamanaParams::new(48, 24, 32, 12, 1.2))
                .unwrap();
            graph
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_vamana_build,
    bench_vamana_build_varying_degree,
    bench_vamana_build_varying_alpha,
    bench_vamana_build_threads,
    bench_search_strategies,
    bench_search_varying_l,
    bench_filtered_builds,
);

criterion_main!(benches);

//! Benchmarks for nearest-neighbor search: kd-tree vs brute force

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facematch::{Embedding, FlatIndex, KdTree, NearestNeighborIndex};

fn create_random_embeddings(n: usize, dim: usize) -> Vec<Embedding> {
    (0..n)
        .map(|_| {
            let data: Vec<f32> = (0..dim).map(|_| rand::random::<f32>()).collect();
            Embedding::new(data).unwrap()
        })
        .collect()
}

fn benchmark_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest");

    for size in [1000, 10000].iter() {
        let embeddings = create_random_embeddings(*size, 128);
        let tree = KdTree::build(&embeddings).unwrap();
        let flat = FlatIndex::build(&embeddings).unwrap();
        let query = Embedding::new(vec![0.5; 128]).unwrap();

        group.bench_with_input(BenchmarkId::new("kd_tree", size), size, |b, _| {
            b.iter(|| tree.nearest(black_box(&query)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("flat", size), size, |b, _| {
            b.iter(|| flat.nearest(black_box(&query)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_nearest_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_k");
    let embeddings = create_random_embeddings(10000, 128);
    let tree = KdTree::build(&embeddings).unwrap();
    let query = Embedding::new(vec![0.5; 128]).unwrap();

    for k in [1, 10, 50].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(k), k, |b, &k| {
            b.iter(|| tree.nearest_k(black_box(&query), black_box(k)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_nearest, benchmark_nearest_k);
criterion_main!(benches);

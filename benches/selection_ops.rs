//! Benchmarks for adjacency and selection operations.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Point3;
use stlcarve::algo::{select_by_normal, AdjacencyOptions};
use stlcarve::mesh::build_from_soup;
use stlcarve::prelude::*;

/// Triangle soup over an `n x n` grid, bent into a shallow bowl so normals vary.
fn create_bowl_soup(n: usize) -> TriangleMesh {
    let height = |i: usize, j: usize| {
        let x = i as f64 / n as f64 - 0.5;
        let y = j as f64 / n as f64 - 0.5;
        Point3::new(i as f64, j as f64, (x * x + y * y) * n as f64)
    };

    let mut triangles = Vec::with_capacity(n * n * 2);
    for j in 0..n {
        for i in 0..n {
            let p00 = height(i, j);
            let p10 = height(i + 1, j);
            let p01 = height(i, j + 1);
            let p11 = height(i + 1, j + 1);
            triangles.push([p00, p10, p11]);
            triangles.push([p00, p11, p01]);
        }
    }

    build_from_soup(&triangles).unwrap()
}

fn bench_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency_build");
    for n in [32, 128] {
        let mesh = create_bowl_soup(n);
        group.bench_with_input(BenchmarkId::new("parallel", n), &mesh, |b, mesh| {
            b.iter(|| AdjacencyIndex::build(mesh))
        });
        group.bench_with_input(BenchmarkId::new("sequential", n), &mesh, |b, mesh| {
            let options = AdjacencyOptions::default().with_parallel(false);
            b.iter(|| AdjacencyIndex::build_with_options(mesh, &options))
        });
    }
    group.finish();
}

fn bench_selection(c: &mut Criterion) {
    let mesh = create_bowl_soup(128);
    let adjacency = AdjacencyIndex::build(&mesh);
    let center = FaceId::new(mesh.num_faces() / 2);

    let mut group = c.benchmark_group("grow_128");
    for tolerance in [5.0, 30.0, 180.0] {
        group.bench_with_input(BenchmarkId::from_parameter(tolerance), &tolerance, |b, &t| {
            b.iter(|| grow(&adjacency, center, t).unwrap())
        });
    }
    group.finish();

    c.bench_function("select_by_normal_128", |b| {
        let up = nalgebra::Vector3::z();
        b.iter(|| select_by_normal(&adjacency, &up, 0.02).unwrap())
    });

    c.bench_function("store_add_region_128", |b| {
        let region = grow(&adjacency, center, 30.0).unwrap();
        b.iter(|| {
            let mut store = GroupStore::new(mesh.num_faces());
            store.add_faces(store.current_group(), &region).unwrap();
            store
        })
    });
}

criterion_group!(benches, bench_adjacency, bench_selection);
criterion_main!(benches);

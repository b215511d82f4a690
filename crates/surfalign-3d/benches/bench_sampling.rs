use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DVec3;
use rand::{rngs::StdRng, SeedableRng};

use surfalign_3d::{mesh::TriMesh, sampling, spatial::TriangleTree};

// uv sphere with `n` rings and `2n` segments
fn uv_sphere(n: usize) -> TriMesh {
    let mut vertices = Vec::new();
    for i in 0..=n {
        let theta = std::f64::consts::PI * i as f64 / n as f64;
        for j in 0..2 * n {
            let phi = std::f64::consts::PI * j as f64 / n as f64;
            vertices.push([
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos(),
            ]);
        }
    }

    let mut faces = Vec::new();
    let cols = 2 * n;
    for i in 0..n {
        for j in 0..cols {
            let a = i * cols + j;
            let b = i * cols + (j + 1) % cols;
            let c = a + cols;
            let d = b + cols;
            faces.push([a, c, b]);
            faces.push([b, c, d]);
        }
    }

    TriMesh::new(vertices, faces).unwrap()
}

fn bench_sample_surface(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_mesh_surface");
    let mesh = uv_sphere(64);

    for num_samples in [1000, 10000, 100000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_samples as u64));
        group.bench_with_input(
            BenchmarkId::new("sample_mesh_surface", num_samples),
            num_samples,
            |b, &n| {
                let mut rng = StdRng::seed_from_u64(0);
                b.iter(|| black_box(sampling::sample_mesh_surface(&mesh, n, &mut rng).unwrap()));
            },
        );
    }
}

fn bench_closest_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("closest_point");

    for rings in [16, 64, 128].iter() {
        let mesh = uv_sphere(*rings);
        let tree = TriangleTree::new(&mesh);
        let queries = sampling::sample_mesh_surface(&mesh, 1000, &mut StdRng::seed_from_u64(1))
            .unwrap()
            .into_iter()
            .map(|p| DVec3::from_array(p) * 1.1)
            .collect::<Vec<_>>();

        group.throughput(criterion::Throughput::Elements(queries.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("triangle_tree", mesh.num_faces()),
            &queries,
            |b, queries| {
                b.iter(|| {
                    for q in queries {
                        black_box(tree.closest_point(*q));
                    }
                });
            },
        );
    }
}

criterion_group!(benches, bench_sample_surface, bench_closest_point);
criterion_main!(benches);

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DMat4;
use rand::{rngs::StdRng, Rng, SeedableRng};

use surfalign_icp::{
    matcher::Matcher, minimizer::ErrorMinimizer, outlier::OutlierFilter, pointcloud::DataPoints,
    Icp,
};

fn random_cloud(n: usize, rng: &mut StdRng) -> DataPoints {
    let points = (0..n)
        .map(|_| {
            let (x, y) = (rng.random::<f64>(), rng.random::<f64>());
            [x, y, 0.2 * (4.0 * x).sin() * (3.0 * y).cos()]
        })
        .collect::<Vec<_>>();
    DataPoints::from_points(&points)
}

fn bench_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");
    let mut rng = StdRng::seed_from_u64(0);

    for num_points in [1000, 10000, 50000].iter() {
        let reference = random_cloud(*num_points, &mut rng);
        let reading = random_cloud(*num_points, &mut rng);
        let index = Matcher::default().build(&reference);

        group.throughput(criterion::Throughput::Elements(*num_points as u64));
        group.bench_with_input(
            BenchmarkId::new("kdtree_find", num_points),
            &reading,
            |b, reading| b.iter(|| black_box(index.find(reading))),
        );
    }
}

fn bench_similarity_icp(c: &mut Criterion) {
    let mut group = c.benchmark_group("icp");
    group.sample_size(10);
    let mut rng = StdRng::seed_from_u64(1);

    for num_points in [2000, 10000].iter() {
        let reference = random_cloud(*num_points, &mut rng);
        let initial = DMat4::from_translation(glam::DVec3::new(0.02, -0.01, 0.0));

        for minimizer in [ErrorMinimizer::PointToPoint, ErrorMinimizer::PointToPointSimilarity] {
            let icp = Icp {
                reading_filters: vec![],
                reference_filters: vec![],
                outlier_filters: vec![OutlierFilter::TrimmedDist { ratio: 0.85 }],
                error_minimizer: minimizer,
                ..Icp::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{minimizer:?}"), num_points),
                &reference,
                |b, reference| {
                    b.iter(|| {
                        let outcome = icp
                            .compute(reference, reference, &initial, &mut StdRng::seed_from_u64(0))
                            .unwrap();
                        black_box(outcome)
                    })
                },
            );
        }
    }
}

criterion_group!(benches, bench_matcher, bench_similarity_icp);
criterion_main!(benches);

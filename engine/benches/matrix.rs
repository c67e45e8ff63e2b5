use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use route_buddy::{
    compute_statistics, DistanceMatrixEngine, EngineConfig, Exporter, Location,
};

fn grid_locations(n: usize) -> Vec<Location> {
    (0..n)
        .map(|i| {
            let lat = 43.0 + (i / 10) as f64 * 0.25;
            let lng = 1.0 + (i % 10) as f64 * 0.25;
            Location::new(format!("P{i}"), lat, lng)
        })
        .collect()
}

fn benchmark_matrix(c: &mut Criterion) {
    let config = EngineConfig::default().with_seed(42);
    let mut group = c.benchmark_group("distance_matrix");

    for n in [10, 50, 200] {
        let locations = grid_locations(n);
        group.bench_with_input(BenchmarkId::new("compute", n), &locations, |b, locations| {
            let mut engine = DistanceMatrixEngine::from_config(&config).expect("config");
            b.iter(|| engine.compute_matrix(black_box(locations)))
        });
    }

    group.finish();
}

fn benchmark_consumers(c: &mut Criterion) {
    let locations = grid_locations(100);
    let mut engine =
        DistanceMatrixEngine::from_config(&EngineConfig::default().with_seed(7)).expect("config");
    let matrix = engine.compute_matrix(&locations).expect("matrix");

    c.bench_function("statistics_100", |b| {
        b.iter(|| compute_statistics(black_box(&locations), black_box(&matrix)))
    });
    c.bench_function("csv_100", |b| {
        let exporter = Exporter::new(&locations, Some(&matrix)).expect("exporter");
        b.iter(|| exporter.to_csv())
    });
}

criterion_group!(benches, benchmark_matrix, benchmark_consumers);
criterion_main!(benches);

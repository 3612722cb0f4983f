use criterion::{Criterion, criterion_group, criterion_main};
use gridreg::{GridSearch, Point, PointSet, PointTransform, transform_points};
use rand::Rng;

fn search() -> GridSearch<f64> {
    let mut rng = rand::rng();

    let fixed: PointSet<f64> = (0..200)
        .map(|_| Point::new(rng.random_range(0.0..1000.), rng.random_range(0.0..1000.)))
        .collect();
    let offset = PointTransform::translation(rng.random_range(-30.0..30.), rng.random_range(-30.0..30.));
    let moving = transform_points(&fixed, &offset);

    GridSearch::new(fixed, moving)
        .with_levels(4, -1)
        .with_min_size_exp(2)
        .with_chunk_count(8)
}

fn translation_benchmark(c: &mut Criterion) {
    let mut translation = c.benchmark_group("translation");
    translation.sample_size(10);

    let search = search();
    translation.bench_function("translation blocking", |b| {
        b.iter(|| search.find_translation().unwrap())
    });

    translation.bench_function("translation parallel", |b| {
        b.iter(|| search.find_translation_par().unwrap())
    });
}

criterion_group!(benches, translation_benchmark);
criterion_main!(benches);

use criterion::Criterion;
use epi_detection::{growth_curve::GrowthCurve, GrowthModel};
use std::hint::black_box;

pub fn growth_curve_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth_curve::create_deltas");
    let exponential = GrowthCurve::new(GrowthModel::Exponential, 1.25, 1.1);
    let power_law = GrowthCurve::new(GrowthModel::PowerLaw { decay: None }, 1.25, 1.25);
    let decaying = GrowthCurve::new(GrowthModel::PowerLaw { decay: Some(35.0) }, 1.25, 1.25);

    group.bench_function("exponential", |b| {
        b.iter(|| black_box(exponential.create_deltas(black_box(18), black_box(57))));
    });

    group.bench_function("power_law", |b| {
        b.iter(|| black_box(power_law.create_deltas(black_box(18), black_box(57))));
    });

    group.bench_function("power_law_decay", |b| {
        b.iter(|| black_box(decaying.create_deltas(black_box(18), black_box(57))));
    });

    group.finish();
}

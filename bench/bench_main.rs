use criterion::{criterion_group, criterion_main};

mod benchmarks;
use benchmarks::growth_curves::growth_curve_benchmarks;
use benchmarks::simulation::simulation_benchmarks;

criterion_group!(
    detection_benches,
    growth_curve_benchmarks,
    simulation_benchmarks,
);

criterion_main!(detection_benches);

use criterion::Criterion;
use epi_detection::{
    growth_curve::GrowthCurve, optimizer::setup_worker_context, parameters::ContextParametersExt,
    simulator::ContextSimulatorExt, Observations,
};
use ixa::{Context, ContextGlobalPropertiesExt};
use std::{hint::black_box, path::PathBuf};

pub fn simulation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator::simulate");
    let parameters = {
        let mut context = Context::new();
        context
            .load_global_properties(&PathBuf::from("./input/input.json"))
            .expect("Valid input file");
        context.get_params().clone()
    };
    let observations =
        Observations::from_csv(&parameters.observations_file).expect("Valid observations file");
    let prefix_length = 10;
    let mut context = setup_worker_context(&parameters, &observations, prefix_length, 8675309)
        .expect("Valid worker context");
    let deltas = GrowthCurve::new(parameters.growth_model, parameters.gamma1, 1.25).create_deltas(
        prefix_length + parameters.restriction_day,
        prefix_length + observations.len() + parameters.extra_days,
    );

    for b0 in [30.0, 100.0, 200.0] {
        group.bench_function(format!("b0_{b0}"), |b| {
            b.iter(|| black_box(context.simulate(black_box(b0), &deltas)));
        });
    }

    group.finish();
}

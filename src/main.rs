use clap::Parser;
use epi_detection::{
    parameters::ContextParametersExt, profiling, reports, run_grid_search, Observations, Params,
};
use ixa::{info, set_log_level, Context, ContextGlobalPropertiesExt, IxaError, LevelFilter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// path to the input file
    #[arg(short, long)]
    input_file: PathBuf,

    /// path to the output directory
    #[arg(short, long)]
    output_directory: PathBuf,

    /// number of worker threads; defaults to the number of cores
    #[arg(short, long)]
    threads: Option<usize>,

    /// log level (off, error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

/// Reads and validates the parameters, then the observed series they point to.
fn initialize(args: &Args) -> Result<(Params, Observations), IxaError> {
    let mut context = Context::new();
    // read the global properties.
    context.load_global_properties(&args.input_file)?;
    let parameters = context.get_params().clone();
    let observations = Observations::from_csv(&parameters.observations_file)?;
    info!(
        "Loaded {} observed days ({} positive) from {}",
        observations.len(),
        observations.total_positive(),
        parameters.observations_file.display()
    );
    Ok((parameters, observations))
}

fn run(args: &Args) -> Result<(), IxaError> {
    let (parameters, observations) = initialize(args)?;

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = args.threads {
        pool = pool.num_threads(threads);
    }
    pool.build_global()
        .map_err(|e| IxaError::IxaError(format!("Could not start the worker pool: {e}")))?;

    let results = run_grid_search(&parameters, &observations)?;
    reports::write_reports(&args.output_directory, &results)?;

    profiling::print_profiling_data();
    if let Some(file_name) = &parameters.profiling_data_path {
        profiling::write_profiling_data(&args.output_directory.join(file_name))?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    set_log_level(args.log_level);
    run(&args).expect("Error running the grid search.");
}

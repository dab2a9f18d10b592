use std::sync::{Mutex, PoisonError};

use ixa::{
    debug, info, Context, ContextGlobalPropertiesExt, ContextRandomExt, IxaError, PluginContext,
};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    growth_curve::GrowthCurve,
    observations::Observations,
    parameters::{ContextParametersExt, GlobalParams, Params},
    population_model,
    profiling::{
        increment_named_count, open_span, CONFIGURATION_LABEL, EARLY_STOP_LABEL, GRID_CELL_SPAN,
        REPETITION_LABEL, RETAINED_CONFIGURATION_LABEL, SIMULATION_SPAN,
    },
    simulator::{self, ContextSimulatorExt, SimulationRun},
};

/// One point of the search grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterConfiguration {
    pub shape: f64,
    pub prefix_length: usize,
    pub b0: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    /// Mean error over the completed repetitions; `+inf` when the mean is not finite.
    pub average_error: f64,
    pub average_deaths: f64,
    /// Repetitions actually run. Fewer than configured when the configuration stopped early.
    pub repetitions: usize,
    pub early_stopped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridPointResult {
    pub params: ParameterConfiguration,
    pub deltas: Vec<f64>,
    /// Every repetition, for configurations scoring below the score threshold; empty otherwise.
    pub runs: Vec<SimulationRun>,
    pub summary: RunSummary,
}

/// The `b0` with the lowest average error for one (shape, prefix length) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestFit {
    pub params: ParameterConfiguration,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridSearchResults {
    pub grid: Vec<GridPointResult>,
    pub best_fits: Vec<BestFit>,
}

/// Number of repetitions after which a poorly scoring configuration may be abandoned.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn early_stop_after(repetitions: usize) -> usize {
    (repetitions as f64).sqrt().ceil() as usize
}

/// Every (shape, prefix length) pair, shape-major.
#[must_use]
pub fn grid_cells(parameters: &Params) -> Vec<(f64, usize)> {
    parameters
        .shape_values
        .values()
        .into_iter()
        .flat_map(|shape| {
            parameters
                .prefix_lengths
                .clone()
                .map(move |prefix_length| (shape, prefix_length))
        })
        .collect()
}

/// A context for one grid cell: parameters first, then the population model and its
/// log-factorial cache, then the observed series, and the random streams last.
///
/// # Errors
/// If the parameters are invalid or the population model cannot be built.
pub fn setup_worker_context(
    parameters: &Params,
    observations: &Observations,
    prefix_length: usize,
    seed: u64,
) -> Result<Context, IxaError> {
    let mut context = Context::new();
    context.set_global_property_value(GlobalParams, parameters.clone())?;
    population_model::init(&mut context)?;
    simulator::init(&mut context, observations, prefix_length);
    context.init_random(seed);
    Ok(context)
}

pub trait ContextOptimizerExt: PluginContext + ContextParametersExt + ContextSimulatorExt {
    /// Runs the configured number of repetitions for one `b0`, stopping early when the running
    /// average after `early_stop_after(repetitions)` repetitions already exceeds
    /// `early_stop_factor * score_threshold`. An early stop reports the partial average.
    ///
    /// # Errors
    /// If a repetition fails.
    #[allow(clippy::cast_precision_loss)]
    fn evaluate_configuration(
        &mut self,
        b0: f64,
        deltas: &[f64],
    ) -> Result<(RunSummary, Vec<SimulationRun>), IxaError> {
        let (repetitions, score_threshold, early_stop_limit) = {
            let parameters = self.get_params();
            (
                parameters.repetitions,
                parameters.score_threshold,
                parameters.early_stop_factor * parameters.score_threshold,
            )
        };
        let checkpoint = early_stop_after(repetitions);
        increment_named_count(CONFIGURATION_LABEL);

        let mut runs = Vec::with_capacity(repetitions);
        let mut total_error = 0.0;
        let mut total_deaths = 0u64;
        let mut early_stopped = false;
        for repetition in 1..=repetitions {
            let run = {
                let _span = open_span(SIMULATION_SPAN);
                self.simulate(b0, deltas)?
            };
            increment_named_count(REPETITION_LABEL);
            total_error += run.error;
            total_deaths += u64::from(run.total_deaths());
            runs.push(run);
            if repetition == checkpoint
                && repetition < repetitions
                && total_error / repetition as f64 > early_stop_limit
            {
                increment_named_count(EARLY_STOP_LABEL);
                early_stopped = true;
                break;
            }
        }

        let completed = runs.len() as f64;
        let mut average_error = total_error / completed;
        if !average_error.is_finite() {
            average_error = f64::INFINITY;
        }
        let summary = RunSummary {
            average_error,
            average_deaths: total_deaths as f64 / completed,
            repetitions: runs.len(),
            early_stopped,
        };
        if average_error < score_threshold {
            increment_named_count(RETAINED_CONFIGURATION_LABEL);
        } else {
            runs = Vec::new();
        }
        Ok((summary, runs))
    }
}
impl ContextOptimizerExt for Context {}

struct CellResult {
    points: Vec<GridPointResult>,
    best_fit: BestFit,
}

fn evaluate_cell(
    parameters: &Params,
    observations: &Observations,
    shape: f64,
    prefix_length: usize,
    b0_values: &[f64],
    seed: u64,
) -> Result<CellResult, IxaError> {
    let _span = open_span(GRID_CELL_SPAN);
    let mut context = setup_worker_context(parameters, observations, prefix_length, seed)?;
    let deltas = GrowthCurve::new(parameters.growth_model, parameters.gamma1, shape)
        .create_deltas(
            prefix_length + parameters.restriction_day,
            prefix_length + observations.len() + parameters.extra_days,
        );

    let mut points = Vec::with_capacity(b0_values.len());
    let mut best_fit: Option<BestFit> = None;
    for &b0 in b0_values {
        let (summary, runs) = context.evaluate_configuration(b0, &deltas)?;
        let params = ParameterConfiguration {
            shape,
            prefix_length,
            b0,
        };
        debug!(
            "shape {shape}, prefix length {prefix_length}, b0 {b0}: average error {:.3}, \
             average deaths {:.2} over {} repetitions{}",
            summary.average_error,
            summary.average_deaths,
            summary.repetitions,
            if summary.early_stopped {
                " (stopped early)"
            } else {
                ""
            }
        );
        if best_fit.is_none_or(|best| summary.average_error < best.summary.average_error) {
            best_fit = Some(BestFit { params, summary });
        }
        points.push(GridPointResult {
            params,
            deltas: deltas.clone(),
            runs,
            summary,
        });
    }

    let best_fit =
        best_fit.ok_or_else(|| IxaError::IxaError("The b0 grid is empty.".to_string()))?;
    info!(
        "shape {shape}, prefix length {prefix_length}: optimal b0 {}, deaths {:.2}, error {:.3}",
        best_fit.params.b0, best_fit.summary.average_deaths, best_fit.summary.average_error
    );
    Ok(CellResult { points, best_fit })
}

fn configuration_key(params: &ParameterConfiguration) -> (f64, usize, f64) {
    (params.shape, params.prefix_length, params.b0)
}

/// Scores every configuration of the grid. Cells (shape, prefix length) run in parallel on the
/// rayon pool, each in its own context seeded with `base_seed + cell index`; the results are
/// sorted by (shape, prefix length, b0) regardless of completion order.
///
/// # Errors
/// If any cell fails, e.g. because a day's tested count exceeds the population size.
#[allow(clippy::cast_possible_truncation)]
pub fn run_grid_search(
    parameters: &Params,
    observations: &Observations,
) -> Result<GridSearchResults, IxaError> {
    let cells = grid_cells(parameters);
    let b0_values = parameters.b0_values.values();
    let base_seed = parameters.seed.unwrap_or_else(rand::random);
    info!(
        "Searching {} cells of {} b0 values with {} repetitions each (base seed {base_seed})",
        cells.len(),
        b0_values.len(),
        parameters.repetitions
    );

    let results = Mutex::new(Vec::with_capacity(cells.len()));
    cells
        .par_iter()
        .enumerate()
        .try_for_each(|(index, &(shape, prefix_length))| {
            // Contexts stay on their worker; only the error message, tagged with its cell,
            // crosses threads.
            let cell = evaluate_cell(
                parameters,
                observations,
                shape,
                prefix_length,
                &b0_values,
                base_seed.wrapping_add(index as u64),
            )
            .map_err(|e| {
                format!("Cell with shape {shape}, prefix length {prefix_length}: {e}")
            })?;
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(cell);
            Ok::<(), String>(())
        })
        .map_err(IxaError::IxaError)?;

    let cells = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    let mut grid = Vec::new();
    let mut best_fits = Vec::with_capacity(cells.len());
    for cell in cells {
        grid.extend(cell.points);
        best_fits.push(cell.best_fit);
    }
    grid.sort_by(|a, b| {
        let (a, b) = (configuration_key(&a.params), configuration_key(&b.params));
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.total_cmp(&b.2))
    });
    best_fits.sort_by(|a, b| {
        a.params
            .shape
            .total_cmp(&b.params.shape)
            .then(a.params.prefix_length.cmp(&b.params.prefix_length))
    });
    Ok(GridSearchResults { grid, best_fits })
}

#[cfg(test)]
mod test {
    use ixa::{assert_almost_eq, IxaError};

    use super::{
        early_stop_after, grid_cells, run_grid_search, setup_worker_context, ContextOptimizerExt,
    };
    use crate::{
        growth_curve::GrowthCurve,
        observations::{test::slovak_observations, Observations},
        parameters::{test::test_params, GridAxis, Params},
        simulator::ContextSimulatorExt,
    };

    fn deltas(parameters: &Params, observed_days: usize, prefix_length: usize) -> Vec<f64> {
        GrowthCurve::new(parameters.growth_model, parameters.gamma1, 1.25).create_deltas(
            prefix_length + parameters.restriction_day,
            prefix_length + observed_days + parameters.extra_days,
        )
    }

    #[test]
    fn test_early_stop_after() {
        assert_eq!(early_stop_after(200), 15);
        assert_eq!(early_stop_after(100), 10);
        assert_eq!(early_stop_after(1), 1);
    }

    #[test]
    fn test_grid_cells() {
        let mut parameters = test_params();
        parameters.shape_values = GridAxis {
            start: 1.0,
            stop: 1.5,
            step: 0.25,
        };
        parameters.prefix_lengths = 2..5;
        let cells = grid_cells(&parameters);
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], (1.0, 2));
        assert_eq!(cells[3], (1.25, 2));
        assert_eq!(cells[8], (1.5, 4));
    }

    #[test]
    fn test_configuration_retained() {
        let mut parameters = test_params();
        parameters.score_threshold = 1e12;
        parameters.repetitions = 10;
        let observations = slovak_observations();
        let mut context = setup_worker_context(&parameters, &observations, 5, 42).unwrap();
        let deltas = deltas(&parameters, observations.len(), 5);
        let (summary, runs) = context.evaluate_configuration(70.0, &deltas).unwrap();
        assert_eq!(summary.repetitions, 10);
        assert!(!summary.early_stopped);
        assert_eq!(runs.len(), 10);
        #[allow(clippy::cast_precision_loss)]
        let average = runs.iter().map(|run| run.error).sum::<f64>() / runs.len() as f64;
        assert_almost_eq!(summary.average_error, average, 1e-9);
    }

    #[test]
    fn test_configuration_stopped_early() {
        let mut parameters = test_params();
        parameters.score_threshold = -1e9;
        parameters.repetitions = 16;
        let observations = slovak_observations();
        let mut context = setup_worker_context(&parameters, &observations, 5, 42).unwrap();
        let deltas = deltas(&parameters, observations.len(), 5);
        let (summary, runs) = context.evaluate_configuration(70.0, &deltas).unwrap();
        assert!(summary.early_stopped);
        assert_eq!(summary.repetitions, 4);
        assert!(runs.is_empty());
        assert!(summary.average_error.is_finite());
    }

    #[test]
    fn test_average_error_is_finite() {
        let mut parameters = test_params();
        parameters.repetitions = 200;
        parameters.score_threshold = 1e12;
        let observations = slovak_observations();
        let mut context = setup_worker_context(&parameters, &observations, 5, 7).unwrap();
        let deltas = deltas(&parameters, observations.len(), 5);
        let (summary, runs) = context.evaluate_configuration(70.0, &deltas).unwrap();
        assert_eq!(runs.len(), 200);
        assert!(summary.average_error.is_finite());
        assert!(summary.average_error >= 0.0);
        assert!(summary.average_deaths > 0.0);
    }

    #[test]
    fn test_no_deaths_without_death_probability() {
        let mut parameters = test_params();
        parameters.repetitions = 200;
        parameters.death_probabilities = vec![0.0; parameters.age_shares.len()];
        let observations = slovak_observations();
        let mut context = setup_worker_context(&parameters, &observations, 5, 7).unwrap();
        let deltas = deltas(&parameters, observations.len(), 5);
        let (summary, _) = context.evaluate_configuration(70.0, &deltas).unwrap();
        assert!(summary.average_error.is_finite());
        assert_almost_eq!(summary.average_deaths, 0.0, 0.0);
    }

    #[test]
    fn test_grid_search() {
        let mut parameters = test_params();
        parameters.repetitions = 4;
        let observations = slovak_observations();
        let results = run_grid_search(&parameters, &observations).unwrap();

        // Two prefix lengths times three b0 values.
        assert_eq!(results.grid.len(), 6);
        assert_eq!(results.best_fits.len(), 2);
        let keys = results
            .grid
            .iter()
            .map(|point| (point.params.prefix_length, point.params.b0))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![(4, 60.0), (4, 75.0), (4, 90.0), (5, 60.0), (5, 75.0), (5, 90.0)]
        );
        for best_fit in &results.best_fits {
            for point in results
                .grid
                .iter()
                .filter(|point| point.params.prefix_length == best_fit.params.prefix_length)
            {
                assert!(best_fit.summary.average_error <= point.summary.average_error);
            }
        }
        for point in &results.grid {
            assert_eq!(point.deltas.len(), point.params.prefix_length + 27 + 10);
            assert_eq!(
                point.runs.is_empty(),
                point.summary.average_error >= parameters.score_threshold
            );
        }
    }

    #[test]
    fn test_grid_search_reproducible_with_seed() {
        let mut parameters = test_params();
        parameters.repetitions = 3;
        parameters.prefix_lengths = 3..5;
        let observations = slovak_observations();
        let first = run_grid_search(&parameters, &observations).unwrap();
        let second = run_grid_search(&parameters, &observations).unwrap();
        let summaries = |results: &super::GridSearchResults| {
            results
                .grid
                .iter()
                .map(|point| point.summary)
                .collect::<Vec<_>>()
        };
        assert_eq!(summaries(&first), summaries(&second));
    }

    #[test]
    fn test_grid_search_capacity_error() {
        let mut parameters = test_params();
        parameters.population_size = 100;
        parameters.repetitions = 2;
        let observations = slovak_observations();
        match run_grid_search(&parameters, &observations).err() {
            Some(IxaError::IxaError(msg)) => {
                assert!(msg.starts_with("Cell with shape 1.25, prefix length "));
                assert!(msg.ends_with("exceeds the population size 100."));
            }
            Some(ue) => panic!(
                "Expected an error that the tested count is too large. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, the grid search completed."),
        }
    }

    #[test]
    fn test_degenerate_growth_loses() {
        let mut parameters = test_params();
        parameters.repetitions = 16;
        parameters.score_threshold = 1e12;
        let observations = slovak_observations();
        let mut context = setup_worker_context(&parameters, &observations, 5, 42).unwrap();
        let deltas = vec![1e11; 5 + observations.len()];
        let (summary, runs) = context.evaluate_configuration(70.0, &deltas).unwrap();
        assert!(summary.average_error.is_infinite());
        assert!(summary.early_stopped);
        assert_eq!(summary.repetitions, 4);
        assert!(runs.is_empty());
        assert_almost_eq!(summary.average_deaths, 0.0, 0.0);
    }

    fn average_error(parameters: &Params, observations: &Observations, b0: f64) -> f64 {
        let mut context = setup_worker_context(parameters, observations, 5, 42).unwrap();
        let deltas = deltas(parameters, observations.len(), 5);
        let (summary, _) = context.evaluate_configuration(b0, &deltas).unwrap();
        summary.average_error
    }

    #[test]
    fn test_closer_fit_scores_lower() {
        let mut parameters = test_params();
        parameters.score_threshold = 1e12;
        let observations = slovak_observations();
        // With b0 = 5 the threshold stays above 0.8, so hardly anyone is detected.
        let tuned = average_error(&parameters, &observations, 70.0);
        let undetected = average_error(&parameters, &observations, 5.0);
        assert!(tuned.is_finite());
        assert!(tuned < undetected);
    }

    #[test]
    fn test_generating_b0_scores_lowest() {
        let mut parameters = test_params();
        parameters.score_threshold = 1e12;
        let slovak = slovak_observations();
        let mut context = setup_worker_context(&parameters, &slovak, 5, 1234).unwrap();
        let run = context
            .simulate(70.0, &deltas(&parameters, slovak.len(), 5))
            .unwrap();
        let observations =
            Observations::new(slovak.tested().to_vec(), run.daily_detected[5..].to_vec()).unwrap();

        let generating = average_error(&parameters, &observations, 70.0);
        // Far too strict and far too lenient detection.
        assert!(generating < average_error(&parameters, &observations, 5.0));
        assert!(generating < average_error(&parameters, &observations, 5_000.0));
    }
}
